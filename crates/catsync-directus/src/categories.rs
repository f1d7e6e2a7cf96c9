//! Typed access to the `categories` collection.

use catsync_core::ids::deserialize_optional_external_id;
use catsync_core::{ExternalId, ItemId};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::serde_util::{external_id_as_number, optional_external_id_as_number};
use crate::store::{
    decode_row, decode_rows, decode_rows_strict, eq, not_null, sort_by_id, to_payload,
    Collection, ItemQuery, TargetStore,
};

const COLLECTION: Collection = Collection::Categories;

pub const FIELDS: &[&str] = &[
    "id",
    "printful_id",
    "parent_id",
    "slug",
    "name",
    "category_position",
    "size",
    "description",
    "image_url",
];

/// A row from `categories`.
///
/// `printful_id` is `None` for categories curated by hand in the CMS; sync
/// never touches those.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetCategory {
    pub id: ItemId,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub printful_id: Option<ExternalId>,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub parent_id: Option<ExternalId>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category_position: Option<i64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Fields written by sync. `description` is curated and never sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    #[serde(serialize_with = "external_id_as_number")]
    pub printful_id: ExternalId,
    #[serde(serialize_with = "optional_external_id_as_number")]
    pub parent_id: Option<ExternalId>,
    pub slug: String,
    pub name: String,
    pub category_position: i64,
    pub size: Option<String>,
    pub image_url: Option<String>,
}

/// All categories linked to the source catalog, oldest first.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn list_synced<S: TargetStore>(store: &S) -> Result<Vec<TargetCategory>, StoreError> {
    let query = ItemQuery::new()
        .filter(not_null("printful_id"))
        .fields(FIELDS)
        .sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut categories: Vec<TargetCategory> = decode_rows(rows, COLLECTION);
    sort_by_id(&mut categories, |c| &c.id);
    Ok(categories)
}

/// Every row carrying `printful_id`, oldest first. More than one row means the
/// uniqueness invariant has been violated.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails, or
/// [`StoreError::MalformedRow`] if a matching row cannot be decoded.
pub async fn find_by_printful_id<S: TargetStore>(
    store: &S,
    printful_id: &ExternalId,
) -> Result<Vec<TargetCategory>, StoreError> {
    let query = ItemQuery::new()
        .filter(eq("printful_id", printful_id))
        .fields(FIELDS)
        .sort(&["id"]);
    let rows = store.read_items(COLLECTION, &query).await?;
    let mut categories: Vec<TargetCategory> = decode_rows_strict(rows, COLLECTION)?;
    sort_by_id(&mut categories, |c| &c.id);
    Ok(categories)
}

/// # Errors
///
/// [`StoreError::DuplicateKey`] when another writer already created the row.
pub async fn create<S: TargetStore>(
    store: &S,
    record: &CategoryRecord,
) -> Result<TargetCategory, StoreError> {
    let payload = to_payload(record, COLLECTION)?;
    let row = store.create_item(COLLECTION, &payload).await?;
    decode_row(row, COLLECTION)
}

/// Overwrites every sync-owned field of `id`.
///
/// # Errors
///
/// Returns [`StoreError`] if the write fails.
pub async fn update<S: TargetStore>(
    store: &S,
    id: &ItemId,
    record: &CategoryRecord,
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
