use thiserror::Error;

/// Failures talking to the source catalog API.
///
/// Every variant is a flavour of "source unavailable"; callers decide whether
/// that is fatal for the whole phase or only for one item.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by catalog API (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("pagination stalled after {collected} of {total} items")]
    PaginationStalled { collected: u64, total: u64 },

    #[error("{context} timed out after {secs}s")]
    Timeout { context: String, secs: u64 },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
