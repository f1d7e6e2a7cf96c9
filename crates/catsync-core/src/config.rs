use crate::app_config::{AppConfig, Environment};
use crate::{ConfigError, Locale};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`
/// lookup and no `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    // Blank values count as missing: an exported-but-empty token is still a
    // misconfiguration.
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default =
        |var: &str, default: &str| -> String { optional(var).unwrap_or_else(|| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, "false")).ok_or_else(|| {
            invalid(var, "expected one of true/false/1/0/yes/no".to_string())
        })
    };

    let printful_api_token = require("PRINTFUL_API_TOKEN")?;
    let directus_url = require("DIRECTUS_URL")?;
    let directus_token = require("DIRECTUS_TOKEN")?;

    let env = parse_environment(&or_default("CATSYNC_ENV", "development"))?;

    let bind_addr = or_default("CATSYNC_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CATSYNC_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CATSYNC_LOG_LEVEL", "info");

    let printful_api_url = or_default("PRINTFUL_API_URL", "https://api.printful.com");
    let printful_store_id = optional("PRINTFUL_STORE_ID");

    let request_timeout_secs = parse_u64("CATSYNC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CATSYNC_USER_AGENT", "catsync/0.1 (catalog-sync)");
    let max_retries = parse_u32("CATSYNC_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("CATSYNC_RETRY_BACKOFF_BASE_MS", "1000")?;

    let page_size = parse_u32("CATSYNC_PAGE_SIZE", "100")?;
    if page_size == 0 {
        return Err(invalid("CATSYNC_PAGE_SIZE", "must be greater than 0".to_string()));
    }
    let product_delay_ms = parse_u64("CATSYNC_PRODUCT_DELAY_MS", "250")?;
    let detail_timeout_secs = parse_u64("CATSYNC_DETAIL_TIMEOUT_SECS", "20")?;
    let catalog_timeout_secs = parse_u64("CATSYNC_CATALOG_TIMEOUT_SECS", "10")?;

    let default_locale = or_default("CATSYNC_DEFAULT_LOCALE", "en")
        .parse::<Locale>()
        .map_err(|reason| invalid("CATSYNC_DEFAULT_LOCALE", reason))?;
    let translation_locales =
        parse_locale_list(&or_default("CATSYNC_TRANSLATION_LOCALES", ""))
            .map_err(|reason| invalid("CATSYNC_TRANSLATION_LOCALES", reason))?;
    let dictionary_path = optional("CATSYNC_DICTIONARY_PATH").map(PathBuf::from);

    let prune_stale_variants = parse_bool("CATSYNC_PRUNE_STALE_VARIANTS")?;
    let prune_categories = parse_bool("CATSYNC_PRUNE_CATEGORIES")?;
    let sync_cron = optional("CATSYNC_SYNC_CRON");

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        printful_api_url,
        printful_api_token,
        printful_store_id,
        directus_url,
        directus_token,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        page_size,
        product_delay_ms,
        detail_timeout_secs,
        catalog_timeout_secs,
        default_locale,
        translation_locales,
        dictionary_path,
        prune_stale_variants,
        prune_categories,
        sync_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CATSYNC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parses a comma-separated locale list; duplicates are dropped.
fn parse_locale_list(raw: &str) -> Result<Vec<Locale>, String> {
    let mut locales = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let locale = part.parse::<Locale>()?;
        if !locales.contains(&locale) {
            locales.push(locale);
        }
    }
    Ok(locales)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
