//! Typed access to the `variants` collection.

use catsync_core::ids::deserialize_optional_external_id;
use catsync_core::{ExternalId, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{
    decode_row, decode_rows, decode_rows_strict, eq, sort_by_id, to_payload, Collection,
    ItemQuery, TargetStore,
};

const COLLECTION: Collection = Collection::Variants;

pub const FIELDS: &[&str] = &[
    "id",
    "product",
    "name",
    "sku",
    "price",
    "is_active",
    "printful_variant_id",
    "size",
    "color",
];

/// A row from `variants`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetVariant {
    pub id: ItemId,
    #[serde(default)]
    pub product: Option<ItemId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub printful_variant_id: Option<ExternalId>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantRecord {
    pub product: ItemId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
    pub printful_variant_id: ExternalId,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Variants owned by `product`, oldest first.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn list_for_product<S: TargetStore>(
    store: &S,
    product: &ItemId,
) -> Result<Vec<TargetVariant>, StoreError> {
    let query = ItemQuery::new()
        .filter(eq("product", product))
        .fields(FIELDS)
        .sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut variants: Vec<TargetVariant> = decode_rows(rows, COLLECTION);
    sort_by_id(&mut variants, |v| &v.id);
    Ok(variants)
}

/// Rows carrying `printful_variant_id`, regardless of owning product.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails, or
/// [`StoreError::MalformedRow`] if a matching row cannot be decoded.
pub async fn find_by_printful_variant_id<S: TargetStore>(
    store: &S,
    printful_variant_id: &ExternalId,
) -> Result<Vec<TargetVariant>, StoreError> {
    let query = ItemQuery::new()
        .filter(eq("printful_variant_id", printful_variant_id))
        .fields(FIELDS)
        .sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut variants: Vec<TargetVariant> = decode_rows_strict(rows, COLLECTION)?;
    sort_by_id(&mut variants, |v| &v.id);
    Ok(variants)
}

/// # Errors
///
/// [`StoreError::DuplicateKey`] when another writer already created the row.
pub async fn create<S: TargetStore>(
    store: &S,
    record: &VariantRecord,
) -> Result<TargetVariant, StoreError> {
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
    record: &VariantRecord,
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
