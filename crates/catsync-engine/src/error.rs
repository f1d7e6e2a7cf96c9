use catsync_directus::StoreError;
use catsync_printful::SourceError;
use thiserror::Error;

use crate::sync::SyncPhase;

/// Run-level failures. Anything that reaches the caller as a `SyncError`
/// aborted the run (or the phase it was raised in).
///
/// Client errors convert by kind: a rejected token, URL or header value is
/// [`SyncError::Configuration`], everything else is the side being
/// unavailable.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("source catalog unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("content store unavailable: {0}")]
    TargetUnavailable(#[source] StoreError),

    #[error("{phase} failed: {source}")]
    Phase {
        phase: SyncPhase,
        #[source]
        source: Box<SyncError>,
    },
}

impl From<SourceError> for SyncError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::InvalidConfig(msg) => {
                Self::Configuration(format!("catalog client: {msg}"))
            }
            other => Self::SourceUnavailable(other),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidConfig(msg) => {
                Self::Configuration(format!("content store: {msg}"))
            }
            other => Self::TargetUnavailable(other),
        }
    }
}

impl SyncError {
    pub(crate) fn in_phase(self, phase: SyncPhase) -> Self {
        match self {
            already @ Self::Phase { .. } => already,
            other => Self::Phase {
                phase,
                source: Box::new(other),
            },
        }
    }
}

/// Failure scoped to one category, product or variant. Logged with the
/// item's external id and folded into the run statistics.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("product detail has no sync_product")]
    MissingProduct,

    #[error("invalid retail price {value:?}")]
    InvalidPrice { value: String },
}
