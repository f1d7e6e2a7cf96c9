//! Typed access to the `products` collection.

use catsync_core::ids::deserialize_optional_external_id;
use catsync_core::{ExternalId, ItemId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::serde_util::null_as_default;
use crate::store::{
    decode_row, decode_rows, decode_rows_strict, eq, sort_by_id, to_payload, Collection,
    ItemQuery, TargetStore,
};

const COLLECTION: Collection = Collection::Products;

pub const FIELDS: &[&str] = &[
    "id",
    "printful_id",
    "external_id",
    "name",
    "description",
    "design_info",
    "product_info",
    "price",
    "thumbnail_url",
    "mockup_images",
    "main_category",
    "description_cs",
    "description_sk",
    "description_en",
    "description_de",
];

/// A row from `products`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetProduct {
    pub id: ItemId,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub printful_id: Option<ExternalId>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub design_info: Option<String>,
    #[serde(default)]
    pub product_info: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mockup_images: Vec<String>,
    /// Primary key of the linked category row.
    #[serde(default)]
    pub main_category: Option<ItemId>,
    #[serde(default)]
    pub description_cs: Option<String>,
    #[serde(default)]
    pub description_sk: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_de: Option<String>,
}

/// Full write payload for a product. Timestamps are only sent when set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub printful_id: ExternalId,
    pub external_id: Option<String>,
    pub name: String,
    pub description: String,
    pub design_info: Option<String>,
    pub product_info: Option<String>,
    pub price: Decimal,
    pub thumbnail_url: Option<String>,
    pub mockup_images: Vec<String>,
    pub main_category: Option<ItemId>,
    pub description_cs: Option<String>,
    pub description_sk: Option<String>,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<DateTime<Utc>>,
}

/// Every product row, synced or not, oldest first.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn list_all<S: TargetStore>(store: &S) -> Result<Vec<TargetProduct>, StoreError> {
    let query = ItemQuery::new().fields(FIELDS).sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut products: Vec<TargetProduct> = decode_rows(rows, COLLECTION);
    sort_by_id(&mut products, |p| &p.id);
    Ok(products)
}

/// Rows carrying `printful_id`, oldest first.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails, or
/// [`StoreError::MalformedRow`] if a matching row cannot be decoded.
pub async fn find_by_printful_id<S: TargetStore>(
    store: &S,
    printful_id: &ExternalId,
) -> Result<Vec<TargetProduct>, StoreError> {
    let query = ItemQuery::new()
        .filter(eq("printful_id", printful_id))
        .fields(FIELDS)
        .sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut products: Vec<TargetProduct> = decode_rows_strict(rows, COLLECTION)?;
    sort_by_id(&mut products, |p| &p.id);
    Ok(products)
}

/// # Errors
///
/// [`StoreError::DuplicateKey`] when another writer already created the row.
pub async fn create<S: TargetStore>(
    store: &S,
    record: &ProductRecord,
) -> Result<TargetProduct, StoreError> {
    let payload = to_payload(record, COLLECTION)?;
    let row = store.create_item(COLLECTION, &payload).await?;
    decode_row(row, COLLECTION)
}

/// # Errors
///
/// Returns [`StoreError`] if the write fails.
pub async fn update<S: TargetStore>(
    store: &S,
    id: &ItemId,
    record: &ProductRecord,
) -> Result<(), StoreError> {
    let payload = to_payload(record, COLLECTION)?;
    store.update_item(COLLECTION, id, &payload).await.map(|_| ())
}

/// # Errors
///
/// Returns [`StoreError`] if the delete fails.
pub async fn delete<S: TargetStore>(store: &S, id: &ItemId) -> Result<(), StoreError> {
    store.delete_item(COLLECTION, id).await
}
