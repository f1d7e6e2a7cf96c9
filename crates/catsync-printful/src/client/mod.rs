//! HTTP client for the Printful catalog and store API.

mod paginate;

use std::time::Duration;

use catsync_core::{ExternalId, Locale};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::types::{
    parse_listing, CatalogDescription, CatalogProductResult, CategoriesResult, Envelope, Listing,
    RawProductDetail, SourceCategory, SourceProductDetail,
};

pub use paginate::{ProductPage, MAX_PAGES};

const LANGUAGE_HEADER: &str = "X-PF-Language";
const STORE_ID_HEADER: &str = "X-PF-Store-Id";

/// Connection settings for [`PrintfulClient`].
#[derive(Debug, Clone)]
pub struct PrintfulClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub store_id: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential back-off; `0` disables sleeping.
    pub backoff_base_ms: u64,
}

impl PrintfulClientConfig {
    #[must_use]
    pub fn from_app_config(config: &catsync_core::AppConfig) -> Self {
        Self {
            base_url: config.printful_api_url.clone(),
            api_token: config.printful_api_token.clone(),
            store_id: config.printful_store_id.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

/// Authenticated client for the source catalog.
///
/// Non-2xx responses are surfaced as typed errors (429 as
/// [`SourceError::RateLimited`], 404 as [`SourceError::NotFound`], anything
/// else as [`SourceError::UnexpectedStatus`]). Transient failures are retried
/// with back-off before being returned.
pub struct PrintfulClient {
    pub(super) client: Client,
    base_url: Url,
    pub(super) max_retries: u32,
    pub(super) backoff_base_ms: u64,
}

impl PrintfulClient {
    /// Builds a client with the bearer token (and store id, if any) installed
    /// as default headers.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidConfig`] for an empty token, a token or
    /// store id that is not a valid header value, or an unparsable base URL;
    /// [`SourceError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: &PrintfulClientConfig) -> Result<Self, SourceError> {
        if config.api_token.trim().is_empty() {
            return Err(SourceError::InvalidConfig(
                "catalog API token is empty".to_owned(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token.trim()))
            .map_err(|e| SourceError::InvalidConfig(format!("invalid API token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(store_id) = &config.store_id {
            let value = HeaderValue::from_str(store_id)
                .map_err(|e| SourceError::InvalidConfig(format!("invalid store id: {e}")))?;
            headers.insert(STORE_ID_HEADER, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        // Trailing slash so `Url::join` appends instead of replacing the last
        // path segment.
        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            SourceError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
        })
    }

    /// Fetches the full category tree in one request.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`]; the category phase treats all of them as fatal.
    pub async fn fetch_categories(&self) -> Result<Listing<SourceCategory>, SourceError> {
        let url = self.endpoint("categories", &[])?;
        let envelope: Envelope<CategoriesResult> =
            self.get_json(&url, None, "categories").await?;
        Ok(parse_listing(envelope.result.categories, "categories"))
    }

    /// Fetches one store product with its variants, optionally localized.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`]; the context of deserialization errors names the
    /// product id.
    pub async fn fetch_product_detail(
        &self,
        product_id: &ExternalId,
        locale: Option<Locale>,
    ) -> Result<SourceProductDetail, SourceError> {
        let url = self.endpoint(&format!("store/products/{product_id}"), &[])?;
        let context = format!("store product {product_id}");
        let envelope: Envelope<RawProductDetail> = self.get_json(&url, locale, &context).await?;
        Ok(envelope.result.parse(product_id))
    }

    /// Fetches the catalog-level description fields for a catalog product.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`]. Callers should prefer
    /// [`Self::fetch_catalog_description`], which never fails.
    pub async fn fetch_catalog_product(
        &self,
        catalog_product_id: &ExternalId,
    ) -> Result<CatalogDescription, SourceError> {
        let url = self.endpoint(&format!("catalog/products/{catalog_product_id}"), &[])?;
        let context = format!("catalog product {catalog_product_id}");
        let envelope: Envelope<CatalogProductResult> =
            self.get_json(&url, None, &context).await?;
        Ok(envelope.result.into_description())
    }

    /// Best-effort catalog enrichment: any failure is logged and reported as
    /// "no enrichment available".
    pub async fn fetch_catalog_description(
        &self,
        catalog_product_id: &ExternalId,
    ) -> Option<CatalogDescription> {
        match self.fetch_catalog_product(catalog_product_id).await {
            Ok(description) => Some(description),
            Err(e) => {
                tracing::debug!(
                    catalog_product_id = %catalog_product_id,
                    error = %e,
                    "catalog description unavailable"
                );
                None
            }
        }
    }

    /// Resolves `path` against the base URL and appends query pairs.
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::InvalidConfig(format!("invalid path '{path}': {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends an authenticated GET with retries and decodes the envelope.
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        locale: Option<Locale>,
        context: &str,
    ) -> Result<Envelope<T>, SourceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let mut request = self.client.get(url.clone());
            if let Some(locale) = locale {
                request = request.header(LANGUAGE_HEADER, locale.language_tag());
            }

            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(SourceError::RateLimited { retry_after_secs });
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(SourceError::NotFound {
                    url: url.to_string(),
                });
            }

            if !status.is_success() {
                return Err(SourceError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<Envelope<T>>(&body).map_err(|e| SourceError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        })
        .await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
