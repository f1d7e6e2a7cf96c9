//! Directus REST implementation of [`TargetStore`].
//!
//! Items live under `/items/{collection}`. Every successful response wraps
//! its payload in `{"data": ...}`; errors come back as
//! `{"errors": [{"message": ..., "extensions": {"code": ...}}]}`.

use std::time::Duration;

use catsync_core::ItemId;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Collection, ItemQuery, TargetStore};

/// Error codes Directus uses for unique-constraint violations.
const DUPLICATE_CODES: &[&str] = &["RECORD_NOT_UNIQUE"];

/// Connection settings for [`DirectusClient`].
#[derive(Clone)]
pub struct DirectusConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for DirectusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectusConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl DirectusConfig {
    #[must_use]
    pub fn from_app_config(config: &catsync_core::AppConfig) -> Self {
        Self {
            base_url: config.directus_url.clone(),
            token: config.directus_token.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Authenticated Directus client.
pub struct DirectusClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    #[serde(default)]
    code: Option<String>,
}

impl DirectusClient {
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] for an empty or non-header-safe
    /// token, [`StoreError::InvalidUrl`] for an unparsable base URL, and
    /// [`StoreError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: &DirectusConfig) -> Result<Self, StoreError> {
        if config.token.trim().is_empty() {
            return Err(StoreError::InvalidConfig("store token is empty".to_owned()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
            .map_err(|e| StoreError::InvalidConfig(format!("invalid store token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| StoreError::InvalidUrl(format!("'{}': {e}", config.base_url)))?;

        Ok(Self { client, base_url })
    }

    fn items_url(&self, collection: Collection, id: Option<&ItemId>) -> Result<Url, StoreError> {
        let path = match id {
            Some(id) => format!("items/{collection}/{id}"),
            None => format!("items/{collection}"),
        };
        self.base_url
            .join(&path)
            .map_err(|e| StoreError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Builds the read URL. `limit=-1` asks Directus for every row.
    fn read_url(&self, collection: Collection, query: &ItemQuery) -> Result<Url, StoreError> {
        let mut url = self.items_url(collection, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &query.filter {
                pairs.append_pair("filter", &filter.to_string());
            }
            if !query.fields.is_empty() {
                pairs.append_pair("fields", &query.fields.join(","));
            }
            if !query.sort.is_empty() {
                pairs.append_pair("sort", &query.sort.join(","));
            }
            let limit = query
                .limit
                .map_or_else(|| "-1".to_owned(), |n| n.to_string());
            pairs.append_pair("limit", &limit);
        }
        Ok(url)
    }

    /// Sends `request` and returns the `data` member of the response body.
    /// `204 No Content` yields `Value::Null`.
    async fn send(&self, request: RequestBuilder, collection: Collection) -> Result<Value, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body, collection));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str::<DataEnvelope>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| StoreError::Deserialize {
                context: format!("{collection} response"),
                source: e,
            })
    }
}

/// Maps a non-2xx response to a [`StoreError`], recognising unique-constraint
/// violations by their error code.
fn classify_failure(status: u16, body: &str, collection: Collection) -> StoreError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();

    let duplicate = envelope.errors.iter().find(|entry| {
        entry
            .extensions
            .as_ref()
            .and_then(|ext| ext.code.as_deref())
            .is_some_and(|code| DUPLICATE_CODES.contains(&code))
    });
    if let Some(entry) = duplicate {
        return StoreError::DuplicateKey {
            collection: collection.to_string(),
            message: entry.message.clone(),
        };
    }

    let message = envelope
        .errors
        .into_iter()
        .map(|entry| entry.message)
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    StoreError::UnexpectedStatus {
        status,
        collection: collection.to_string(),
        message,
    }
}

impl TargetStore for DirectusClient {
    async fn read_items(
        &self,
        collection: Collection,
        query: &ItemQuery,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.read_url(collection, query)?;
        let data = self.send(self.client.get(url), collection).await?;
        match data {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn create_item(&self, collection: Collection, item: &Value) -> Result<Value, StoreError> {
        let url = self.items_url(collection, None)?;
        self.send(self.client.post(url).json(item), collection).await
    }

    async fn update_item(
        &self,
        collection: Collection,
        id: &ItemId,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        let url = self.items_url(collection, Some(id))?;
        self.send(self.client.patch(url).json(patch), collection).await
    }

    async fn delete_item(&self, collection: Collection, id: &ItemId) -> Result<(), StoreError> {
        let url = self.items_url(collection, Some(id))?;
        self.send(self.client.delete(url), collection).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{eq, not_null};

    fn client() -> DirectusClient {
        DirectusClient::new(&DirectusConfig {
            base_url: "http://directus.local:8055/".to_owned(),
            token: "static-token".to_owned(),
            timeout_secs: 5,
            user_agent: "catsync-test/0.1".to_owned(),
        })
        .unwrap()
    }

    #[test]
    fn read_url_encodes_filter_and_defaults_limit_to_all() {
        let query = ItemQuery::new()
            .filter(not_null("printful_id"))
            .fields(&["id", "printful_id"]);
        let url = client().read_url(Collection::Categories, &query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/items/categories");
        assert!(pairs.contains(&(
            "filter".to_owned(),
            r#"{"printful_id":{"_nnull":true}}"#.to_owned()
        )));
        assert!(pairs.contains(&("fields".to_owned(), "id,printful_id".to_owned())));
        assert!(pairs.contains(&("limit".to_owned(), "-1".to_owned())));
    }

    #[test]
    fn read_url_honours_explicit_limit_and_sort() {
        let query = ItemQuery::new()
            .filter(eq("slug", "mens-wear"))
            .sort(&["id"])
            .limit(1);
        let url = client().read_url(Collection::Products, &query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("sort".to_owned(), "id".to_owned())));
        assert!(pairs.contains(&("limit".to_owned(), "1".to_owned())));
    }

    #[test]
    fn classify_failure_detects_unique_violation() {
        let body = r#"{"errors":[{"message":"Value for field \"printful_id\" in collection \"categories\" has to be unique.","extensions":{"code":"RECORD_NOT_UNIQUE","collection":"categories","field":"printful_id"}}]}"#;
        let err = classify_failure(400, body, Collection::Categories);
        assert!(err.is_duplicate_key(), "got: {err:?}");
    }

    #[test]
    fn classify_failure_keeps_status_and_message() {
        let body = r#"{"errors":[{"message":"You don't have permission to access this.","extensions":{"code":"FORBIDDEN"}}]}"#;
        match classify_failure(403, body, Collection::Products) {
            StoreError::UnexpectedStatus {
                status, message, ..
            } => {
                assert_eq!(status, 403);
                assert!(message.contains("permission"));
            }
            other => panic!("expected UnexpectedStatus, got: {other:?}"),
        }
    }

    #[test]
    fn classify_failure_tolerates_non_json_body() {
        let err = classify_failure(502, "<html>Bad Gateway</html>", Collection::Variants);
        assert!(matches!(err, StoreError::UnexpectedStatus { status: 502, .. }));
    }

    #[test]
    fn new_rejects_empty_token() {
        let err = DirectusClient::new(&DirectusConfig {
            base_url: "http://directus.local".to_owned(),
            token: String::new(),
            timeout_secs: 5,
            user_agent: "ua".to_owned(),
        })
        .err()
        .expect("empty token must fail");
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = DirectusConfig {
            base_url: "http://directus.local".to_owned(),
            token: "super-secret".to_owned(),
            timeout_secs: 5,
            user_agent: "ua".to_owned(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
