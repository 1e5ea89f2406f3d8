//! HTTP surface: `POST /scrape` and `GET /health`.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::process::collect;
use crate::request::{CatalogSource, ReqwestSource};
use crate::taxonomy::{TaxonomyMap, UnknownTag};

/// Everything a handler needs. Built once, shared read-only.
pub struct AppContext {
    pub taxonomy: TaxonomyMap,
    pub source: Arc<dyn CatalogSource>,
    pub target_count: usize,
    pub page_delay: Duration,
}

pub type AppState = Arc<AppContext>;

impl AppContext {
    /// Loads the mapping and builds the catalog client. Any failure here is fatal at startup.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let taxonomy = TaxonomyMap::load(&config.mapping)?;
        info!(
            path = %config.mapping.display(),
            tags = taxonomy.len(),
            "loaded taxonomy mapping"
        );
        let source = ReqwestSource::new(&config.catalog_url, config.timeout())?;
        Ok(Self {
            taxonomy,
            source: Arc::new(source),
            target_count: config.target_count,
            page_delay: config.page_delay(),
        })
    }
}

/// Errors a handler can answer with.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Missing \"tag\" in request payload")]
    MissingTag,
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_tags: Option<Vec<String>>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let error = self.to_string();
        let (status, available_tags) = match self {
            HttpError::MissingTag | HttpError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, None),
            HttpError::UnknownTag(unknown) => (StatusCode::BAD_REQUEST, Some(unknown.available)),
            HttpError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        (status, Json(ErrorBody { error, available_tags })).into_response()
    }
}

impl From<crate::Error> for HttpError {
    fn from(value: crate::Error) -> Self {
        HttpError::Internal(value.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    #[serde(default)]
    tag: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub ids: Vec<u64>,
    pub count: usize,
    pub tag: String,
}

/// Pulls the tag out of the raw body.
/// Anything that isn't a JSON object with a non-null `tag` is a missing tag.
/// Arrays and objects are never tags.
fn extract_tag(body: &[u8]) -> Result<String, HttpError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| HttpError::InvalidPayload(e.to_string()))?;
    let tag = match payload {
        Value::Object(_) => serde_json::from_value::<ScrapeRequest>(payload)
            .ok()
            .and_then(|req| req.tag),
        _ => None,
    };
    match tag {
        None | Some(Value::Null) => Err(HttpError::MissingTag),
        Some(Value::String(tag)) => Ok(tag),
        Some(Value::Array(_) | Value::Object(_)) => Err(HttpError::InvalidPayload(
            "\"tag\" must be a string".to_string(),
        )),
        // Numbers and booleans are looked up by their JSON text.
        Some(other) => Ok(other.to_string()),
    }
}

pub async fn scrape(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ScrapeResponse>, HttpError> {
    let tag = extract_tag(&body)?;
    let taxonomy_id = state.taxonomy.resolve(&tag)?.to_string();
    info!(tag = %tag, taxonomy_id = %taxonomy_id, "scrape requested");

    // Own task, so a panic in the collection becomes a 500 instead of a dropped connection.
    let handle = tokio::spawn({
        let state = state.clone();
        async move {
            collect(
                state.source.clone(),
                &taxonomy_id,
                state.target_count,
                state.page_delay,
            )
            .await
        }
    });
    let collection = handle.await.map_err(|e| {
        error!("collection task failed: {e}");
        HttpError::from(crate::Error::RuntimeJoin(e))
    })?;
    if collection.stop.is_partial() {
        warn!(
            tag = %tag,
            count = collection.ids.len(),
            stop = ?collection.stop,
            "returning partial result"
        );
    }

    Ok(Json(ScrapeResponse {
        count: collection.ids.len(),
        ids: collection.ids,
        tag,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(scrape))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
