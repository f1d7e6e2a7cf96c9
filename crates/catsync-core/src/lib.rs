pub mod app_config;
pub mod config;
pub mod dictionary;
pub mod ids;
pub mod locale;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use dictionary::{Dictionary, StaticDictionary, PLACEHOLDER_KEY};
pub use ids::{ExternalId, ItemId};
pub use locale::Locale;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read dictionary file {path}: {source}")]
    DictionaryFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dictionary file: {0}")]
    DictionaryFileParse(#[from] serde_yaml::Error),
}
