use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("The taxonomy mapping contains no entries.")]
    MappingEmpty,
    #[error("The taxonomy mapping defines tag {0:?} more than once.")]
    DuplicateTag(String),
    #[error("The taxonomy mapping has an empty `{column}` cell on line {line}.")]
    EmptyColumn { column: &'static str, line: u64 },

    #[error("Invalid catalog url {0:?}: {1}")]
    InvalidCatalogUrl(String, String),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Why a single page fetch did not produce a page.
/// None of these are surfaced to HTTP callers, they only end a collection run early.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("catalog responded with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("couldn't decode catalog page: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = value.status() {
            FetchError::Status(status.as_u16())
        } else if value.is_decode() {
            FetchError::Decode(value.to_string())
        } else {
            FetchError::Transport(value.to_string())
        }
    }
}
