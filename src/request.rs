use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::parse::CatalogPage;
use crate::{
    Error, FetchError, Result, MIN_PRICE, PAGE_LIMIT, SALES_TYPE_FILTER, SORT_AGGREGATION,
    SORT_TYPE,
};

/// Search parameters for one page request.
/// Everything except the taxonomy is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub taxonomy: String,
    pub min_price: u32,
    pub sales_type_filter: u32,
    pub sort_type: u32,
    pub sort_aggregation: u32,
    pub limit: u32,
}

impl PageQuery {
    pub fn new(taxonomy: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            min_price: MIN_PRICE,
            sales_type_filter: SALES_TYPE_FILTER,
            sort_type: SORT_TYPE,
            sort_aggregation: SORT_AGGREGATION,
            limit: PAGE_LIMIT,
        }
    }

    /// Query string pairs, in the order the catalog documents them.
    /// The cursor is appended only when there is one.
    pub fn params(&self, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("taxonomy", self.taxonomy.clone()),
            ("minPrice", self.min_price.to_string()),
            ("salesTypeFilter", self.sales_type_filter.to_string()),
            ("sortType", self.sort_type.to_string()),
            ("sortAggregation", self.sort_aggregation.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        params
    }
}

/// Anything that can hand out catalog pages.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(
        &self,
        query: &PageQuery,
        cursor: Option<&str>,
    ) -> std::result::Result<CatalogPage, FetchError>;
}

/// Fetches pages from the real catalog over HTTP.
#[derive(Debug)]
pub struct ReqwestSource {
    client: Client,
    url: Url,
}

impl ReqwestSource {
    /// Every request made through this source is bounded by `timeout`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url =
            Url::parse(url).map_err(|e| Error::InvalidCatalogUrl(url.into(), e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scrap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CatalogSource for ReqwestSource {
    async fn fetch_page(
        &self,
        query: &PageQuery,
        cursor: Option<&str>,
    ) -> std::result::Result<CatalogPage, FetchError> {
        let res = self
            .client
            .get(self.url.clone())
            .query(&query.params(cursor))
            .send()
            .await?
            .error_for_status()?;
        // Read the body ourselves so a timeout while streaming it still counts as a timeout.
        let body = res.bytes().await?;
        CatalogPage::from_json(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
