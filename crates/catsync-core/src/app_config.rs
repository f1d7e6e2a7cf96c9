use std::net::SocketAddr;
use std::path::PathBuf;

use crate::Locale;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub printful_api_url: String,
    pub printful_api_token: String,
    pub printful_store_id: Option<String>,
    pub directus_url: String,
    pub directus_token: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub page_size: u32,
    pub product_delay_ms: u64,
    pub detail_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
    pub default_locale: Locale,
    pub translation_locales: Vec<Locale>,
    pub dictionary_path: Option<PathBuf>,
    pub prune_stale_variants: bool,
    pub prune_categories: bool,
    pub sync_cron: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("printful_api_url", &self.printful_api_url)
            .field("printful_api_token", &"[redacted]")
            .field("printful_store_id", &self.printful_store_id)
            .field("directus_url", &self.directus_url)
            .field("directus_token", &"[redacted]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("page_size", &self.page_size)
            .field("product_delay_ms", &self.product_delay_ms)
            .field("detail_timeout_secs", &self.detail_timeout_secs)
            .field("catalog_timeout_secs", &self.catalog_timeout_secs)
            .field("default_locale", &self.default_locale)
            .field("translation_locales", &self.translation_locales)
            .field("dictionary_path", &self.dictionary_path)
            .field("prune_stale_variants", &self.prune_stale_variants)
            .field("prune_categories", &self.prune_categories)
            .field("sync_cron", &self.sync_cron)
            .finish()
    }
}
