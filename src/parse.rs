use serde::Deserialize;

/// One page of the catalog search response.
/// Only the fields the scraper cares about are decoded.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    #[serde(default)]
    pub data: Vec<CatalogItem>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    #[serde(default)]
    pub id: Option<u64>,
}

impl CatalogPage {
    /// Decodes a raw response body.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Item ids in page order. Items without an id are skipped.
    pub fn item_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.data.iter().filter_map(|item| item.id)
    }

    /// The continuation token, if the catalog has more pages.
    /// An empty token means the same as a missing one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}
