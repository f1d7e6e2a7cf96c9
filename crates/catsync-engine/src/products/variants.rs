//! Variant reconciliation under a resolved product.

use std::collections::{HashMap, HashSet};

use catsync_core::{ExternalId, ItemId};
use catsync_directus::{variants, TargetStore, TargetVariant, VariantRecord};
use catsync_printful::{Quarantine, SourceVariant};

use super::mapping::variant_record;
use crate::dedup::{create_unless_exists, existing_variant, Guarded};
use crate::error::ItemError;
use crate::slug::normalize_for_compare;
use crate::stats::{Outcome, VariantStats};

/// Upserts every source variant of one product, keyed by
/// `printful_variant_id`. Failures are counted per variant.
pub(super) async fn reconcile_variants<S: TargetStore>(
    store: &S,
    product: &ItemId,
    source: &[SourceVariant],
    quarantined: &Quarantine,
    prune_stale: bool,
    stats: &mut VariantStats,
) {
    let (index, complete) = match variants::list_for_product(store, product).await {
        Ok(rows) => (build_index(rows), true),
        Err(e) => {
            tracing::warn!(
                product = %product,
                error = %e,
                "variant index unavailable, relying on per-variant rechecks"
            );
            (HashMap::new(), false)
        }
    };

    for variant in source {
        match reconcile_one(store, product, variant, &index).await {
            Ok(outcome) => stats.record(outcome),
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    external_id = %variant.id,
                    product = %product,
                    error = %e,
                    "variant reconciliation failed"
                );
            }
        }
    }

    if prune_stale && complete && !quarantined.blocks_pruning() {
        prune(store, source, quarantined, &index, stats).await;
    }
}

fn build_index(rows: Vec<TargetVariant>) -> HashMap<ExternalId, TargetVariant> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(id) = row.printful_variant_id.clone() {
            index.entry(id).or_insert(row);
        }
    }
    index
}

async fn reconcile_one<S: TargetStore>(
    store: &S,
    product: &ItemId,
    variant: &SourceVariant,
    index: &HashMap<ExternalId, TargetVariant>,
) -> Result<Outcome, ItemError> {
    let record = variant_record(product, variant)?;

    if let Some(row) = index.get(&variant.id) {
        return update_if_changed(store, row, &record).await;
    }

    let guarded = create_unless_exists(existing_variant(store, &variant.id), || {
        variants::create(store, &record)
    })
    .await?;

    match guarded {
        Guarded::Existing(row) => update_if_changed(store, &row, &record).await,
        Guarded::Created(_) => Ok(Outcome::Created),
        Guarded::LostRace => Ok(Outcome::Skipped),
    }
}

async fn update_if_changed<S: TargetStore>(
    store: &S,
    row: &TargetVariant,
    record: &VariantRecord,
) -> Result<Outcome, ItemError> {
    if !variant_differs(row, record) {
        return Ok(Outcome::Skipped);
    }
    variants::update(store, &row.id, record).await?;
    Ok(Outcome::Updated)
}

async fn prune<S: TargetStore>(
    store: &S,
    source: &[SourceVariant],
    quarantined: &Quarantine,
    index: &HashMap<ExternalId, TargetVariant>,
    stats: &mut VariantStats,
) {
    let live: HashSet<&ExternalId> = source.iter().map(|v| &v.id).collect();
    for (printful_variant_id, row) in index {
        if live.contains(printful_variant_id) || quarantined.contains(printful_variant_id) {
            continue;
        }
        match variants::delete(store, &row.id).await {
            Ok(()) => stats.deleted += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    external_id = %printful_variant_id,
                    error = %e,
                    "stale variant delete failed"
                );
            }
        }
    }
}

fn variant_differs(row: &TargetVariant, record: &VariantRecord) -> bool {
    let loose = |a: Option<&str>, b: Option<&str>| normalize_for_compare(a) != normalize_for_compare(b);

    row.name.as_deref() != Some(record.name.as_str())
        || row.price != Some(record.price)
        || row.is_active != Some(record.is_active)
        || loose(row.sku.as_deref(), record.sku.as_deref())
        || loose(row.size.as_deref(), record.size.as_deref())
        || loose(row.color.as_deref(), record.color.as_deref())
        || row.product.as_ref() != Some(&record.product)
}
