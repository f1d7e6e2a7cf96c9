//! Item-oriented access to the content store.
//!
//! The reconcilers only ever need four verbs (read with a filter, create,
//! patch, delete) over three collections. [`TargetStore`] captures exactly
//! that so the engine can run against Directus in production and against an
//! in-memory store in tests.

use std::future::Future;

use catsync_core::ItemId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::StoreError;

/// Collections written by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Categories,
    Products,
    Variants,
}

impl Collection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Variants => "variants",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read parameters: a Directus filter object plus projection, sort and limit.
///
/// `limit: None` means "all rows".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    pub filter: Option<Value>,
    pub fields: Vec<String>,
    pub sort: Vec<String>,
    pub limit: Option<usize>,
}

impl ItemQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    /// Sort keys; prefix with `-` for descending.
    #[must_use]
    pub fn sort(mut self, keys: &[&str]) -> Self {
        self.sort = keys.iter().map(|k| (*k).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `{field: {_eq: value}}`
pub fn eq(field: &str, value: impl Serialize) -> Value {
    json!({ field: { "_eq": value } })
}

/// `{field: {_nnull: true}}`
#[must_use]
pub fn not_null(field: &str) -> Value {
    json!({ field: { "_nnull": true } })
}

/// `{field: {_null: true}}`
#[must_use]
pub fn is_null(field: &str) -> Value {
    json!({ field: { "_null": true } })
}

/// `{_and: [...]}`
#[must_use]
pub fn and(filters: Vec<Value>) -> Value {
    json!({ "_and": filters })
}

/// Item-level access to the content store.
///
/// Implementations must be safe to share across tasks; every returned future
/// is `Send` so the engine can run inside spawned server jobs.
pub trait TargetStore: Send + Sync {
    /// Reads rows matching `query`.
    fn read_items(
        &self,
        collection: Collection,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Creates a row and returns it as stored (including its new `id`).
    fn create_item(
        &self,
        collection: Collection,
        item: &Value,
    ) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Patches the given fields of an existing row.
    fn update_item(
        &self,
        collection: Collection,
        id: &ItemId,
        patch: &Value,
    ) -> impl Future<Output = Result<Value, StoreError>> + Send;

    fn delete_item(
        &self,
        collection: Collection,
        id: &ItemId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Connectivity probe: reads a single category id.
    fn probe(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let query = ItemQuery::new().fields(&["id"]).limit(1);
            self.read_items(Collection::Categories, &query)
                .await
                .map(|_| ())
        }
    }
}

/// Decodes rows into `T`, logging and skipping rows that do not match the
/// schema.
pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, collection: Collection) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned();
            match serde_json::from_value::<T>(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        id = ?id,
                        error = %e,
                        "quarantined malformed store row"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Decodes rows into `T`, failing on the first row that does not match the
/// schema.
///
/// Used by lookups on a sync key: a stored row that matched the filter but
/// cannot be decoded still occupies the key, and hiding it would let the
/// caller create a duplicate.
pub(crate) fn decode_rows_strict<T: DeserializeOwned>(
    rows: Vec<Value>,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| {
            let id = row
                .get("id")
                .map_or_else(|| "<none>".to_owned(), ToString::to_string);
            serde_json::from_value::<T>(row).map_err(|e| StoreError::MalformedRow {
                collection: collection.to_string(),
                id,
                source: e,
            })
        })
        .collect()
}

/// Decodes a single row returned by a write.
pub(crate) fn decode_row<T: DeserializeOwned>(
    row: Value,
    collection: Collection,
) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Deserialize {
        context: format!("{collection} row"),
        source: e,
    })
}

/// Serializes a typed record into a JSON payload.
pub(crate) fn to_payload<T: Serialize>(
    record: &T,
    collection: Collection,
) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Deserialize {
        context: format!("{collection} payload"),
        source: e,
    })
}

/// Orders rows by primary key, numeric ids numerically.
pub(crate) fn sort_by_id<T>(rows: &mut [T], id: impl Fn(&T) -> &ItemId) {
    rows.sort_by(|a, b| id(a).sort_key().cmp(&id(b).sort_key()));
}
