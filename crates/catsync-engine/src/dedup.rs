//! Authoritative existence checks performed immediately before a create.
//!
//! In-memory indexes built at the start of a phase are only hints: another
//! run (or a retried request) may have written the same external id since.
//! Every create goes through [`create_unless_exists`], which re-reads the
//! store first and treats a unique-constraint rejection as a lost race.

use std::future::Future;

use catsync_core::ExternalId;
use catsync_directus::{
    categories, products, variants, StoreError, TargetCategory, TargetProduct, TargetStore,
    TargetVariant,
};

/// Result of a guarded create.
#[derive(Debug)]
pub enum Guarded<T> {
    /// The record already existed; nothing was written.
    Existing(T),
    Created(T),
    /// The store rejected the create as a duplicate: a concurrent writer won.
    LostRace,
}

/// Runs `recheck`; creates only when it finds nothing.
///
/// # Errors
///
/// Propagates store errors from either step, except duplicate-key
/// rejections which become [`Guarded::LostRace`].
pub async fn create_unless_exists<T, R, C, F>(recheck: R, create: C) -> Result<Guarded<T>, StoreError>
where
    R: Future<Output = Result<Option<T>, StoreError>>,
    C: FnOnce() -> F,
    F: Future<Output = Result<T, StoreError>>,
{
    if let Some(found) = recheck.await? {
        return Ok(Guarded::Existing(found));
    }
    match create().await {
        Ok(created) => Ok(Guarded::Created(created)),
        Err(e) if e.is_duplicate_key() => Ok(Guarded::LostRace),
        Err(e) => Err(e),
    }
}

/// Oldest category carrying `printful_id`.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn existing_category<S: TargetStore>(
    store: &S,
    printful_id: &ExternalId,
) -> Result<Option<TargetCategory>, StoreError> {
    Ok(categories::find_by_printful_id(store, printful_id)
        .await?
        .into_iter()
        .next())
}

/// Oldest product carrying `printful_id`.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn existing_product<S: TargetStore>(
    store: &S,
    printful_id: &ExternalId,
) -> Result<Option<TargetProduct>, StoreError> {
    Ok(products::find_by_printful_id(store, printful_id)
        .await?
        .into_iter()
        .next())
}

/// Oldest variant carrying `printful_variant_id`, whichever product owns it.
///
/// # Errors
///
/// Returns [`StoreError`] if the read fails.
pub async fn existing_variant<S: TargetStore>(
    store: &S,
    printful_variant_id: &ExternalId,
) -> Result<Option<TargetVariant>, StoreError> {
    Ok(variants::find_by_printful_variant_id(store, printful_variant_id)
        .await?
        .into_iter()
        .next())
}
