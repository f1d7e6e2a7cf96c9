use thiserror::Error;

/// Failures talking to the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {collection}: {message}")]
    UnexpectedStatus {
        status: u16,
        collection: String,
        message: String,
    },

    /// A unique constraint rejected a write. Reconcilers treat this as
    /// "another writer got there first", not as a failure.
    #[error("duplicate key in {collection}: {message}")]
    DuplicateKey { collection: String, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored row matched a lookup but does not fit the expected schema.
    #[error("malformed {collection} row {id}: {source}")]
    MalformedRow {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}
