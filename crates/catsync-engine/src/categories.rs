//! Category tree reconciliation and duplicate repair.

use std::collections::{BTreeMap, HashMap, HashSet};

use catsync_core::ExternalId;
use catsync_directus::{categories, CategoryRecord, StoreError, TargetCategory, TargetStore};
use catsync_printful::{Listing, SourceCategory};

use crate::dedup::{create_unless_exists, existing_category, Guarded};
use crate::error::SyncError;
use crate::slug::{normalize_for_compare, slugify};
use crate::stats::{CategoryStats, CleanupStats, Outcome};

/// Reconciles source categories into the `categories` collection, keyed by
/// `printful_id`.
pub struct CategoryReconciler<'a, S> {
    store: &'a S,
    prune: bool,
}

impl<'a, S: TargetStore> CategoryReconciler<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            prune: false,
        }
    }

    /// Delete synced categories that disappeared from the source.
    #[must_use]
    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Creates, updates or skips each source category.
    ///
    /// Per-category failures are logged and counted; they never abort the
    /// loop. Quarantined source entries are never pruned.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TargetUnavailable`] if the existing categories
    /// cannot be loaded.
    pub async fn reconcile(
        &self,
        listing: &Listing<SourceCategory>,
    ) -> Result<CategoryStats, SyncError> {
        let source = listing.items.as_slice();
        let existing = categories::list_synced(self.store).await?;
        let mut index: HashMap<ExternalId, TargetCategory> = HashMap::with_capacity(existing.len());
        for row in existing {
            if let Some(printful_id) = row.printful_id.clone() {
                // rows arrive oldest first; the oldest is canonical
                index.entry(printful_id).or_insert(row);
            }
        }

        let mut stats = CategoryStats::default();
        for category in source {
            match self.reconcile_one(category, &mut index).await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        external_id = %category.id,
                        error = %e,
                        "category reconciliation failed"
                    );
                }
            }
        }

        if self.prune {
            self.prune_missing(listing, &index, &mut stats).await;
        }

        tracing::info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            deleted = stats.deleted,
            failed = stats.failed,
            "categories reconciled"
        );
        Ok(stats)
    }

    async fn reconcile_one(
        &self,
        category: &SourceCategory,
        index: &mut HashMap<ExternalId, TargetCategory>,
    ) -> Result<Outcome, StoreError> {
        let record = to_record(category);

        if let Some(row) = index.get(&category.id) {
            return self.update_if_changed(row, &record).await;
        }

        let guarded = create_unless_exists(existing_category(self.store, &category.id), || {
            categories::create(self.store, &record)
        })
        .await?;

        match guarded {
            Guarded::Existing(row) => {
                let outcome = self.update_if_changed(&row, &record).await?;
                index.insert(category.id.clone(), row);
                Ok(outcome)
            }
            Guarded::Created(row) => {
                tracing::debug!(external_id = %category.id, id = %row.id, "category created");
                index.insert(category.id.clone(), row);
                Ok(Outcome::Created)
            }
            Guarded::LostRace => {
                tracing::debug!(external_id = %category.id, "category created concurrently, skipping");
                Ok(Outcome::Skipped)
            }
        }
    }

    async fn update_if_changed(
        &self,
        row: &TargetCategory,
        record: &CategoryRecord,
    ) -> Result<Outcome, StoreError> {
        if !category_differs(row, record) {
            return Ok(Outcome::Skipped);
        }
        categories::update(self.store, &row.id, record).await?;
        tracing::debug!(external_id = %record.printful_id, id = %row.id, "category updated");
        Ok(Outcome::Updated)
    }

    async fn prune_missing(
        &self,
        listing: &Listing<SourceCategory>,
        index: &HashMap<ExternalId, TargetCategory>,
        stats: &mut CategoryStats,
    ) {
        if listing.items.is_empty() {
            tracing::warn!("source returned no categories, skipping category pruning");
            return;
        }
        if listing.quarantine.blocks_pruning() {
            tracing::warn!(
                unidentified = listing.quarantine.unidentified,
                "malformed categories without ids, skipping category pruning"
            );
            return;
        }
        let live: HashSet<&ExternalId> = listing.items.iter().map(|c| &c.id).collect();
        for (printful_id, row) in index {
            if live.contains(printful_id) || listing.quarantine.contains(printful_id) {
                continue;
            }
            match categories::delete(self.store, &row.id).await {
                Ok(()) => stats.deleted += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(external_id = %printful_id, error = %e, "category delete failed");
                }
            }
        }
    }

    /// Repairs violations of `printful_id` uniqueness: for every id held by
    /// more than one row, keeps the oldest row and deletes the rest.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TargetUnavailable`] if the categories cannot be
    /// listed. Individual delete failures are counted, not returned.
    pub async fn cleanup_duplicates(&self) -> Result<CleanupStats, SyncError> {
        let rows = categories::list_synced(self.store).await?;
        let mut groups: BTreeMap<ExternalId, Vec<TargetCategory>> = BTreeMap::new();
        for row in rows {
            if let Some(printful_id) = row.printful_id.clone() {
                groups.entry(printful_id).or_default().push(row);
            }
        }

        let mut stats = CleanupStats::default();
        for (printful_id, mut group) in groups {
            if group.len() < 2 {
                continue;
            }
            stats.groups += 1;
            group.sort_by(|a, b| a.id.sort_key().cmp(&b.id.sort_key()));
            let keep = group.remove(0);
            for duplicate in group {
                match categories::delete(self.store, &duplicate.id).await {
                    Ok(()) => {
                        stats.deleted += 1;
                        tracing::info!(
                            external_id = %printful_id,
                            kept = %keep.id,
                            deleted = %duplicate.id,
                            "duplicate category removed"
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            external_id = %printful_id,
                            id = %duplicate.id,
                            error = %e,
                            "duplicate category delete failed"
                        );
                    }
                }
            }
        }
        Ok(stats)
    }
}

fn to_record(category: &SourceCategory) -> CategoryRecord {
    CategoryRecord {
        printful_id: category.id.clone(),
        parent_id: category.parent_id.clone(),
        slug: slugify(&category.title),
        name: category.title.clone(),
        category_position: category.catalog_position,
        size: category.size.clone(),
        image_url: category.image_url.clone(),
    }
}

/// Loose comparison on `parent_id`, `size` and `image_url`; strict on
/// `name`, `slug` and `category_position`.
fn category_differs(row: &TargetCategory, record: &CategoryRecord) -> bool {
    let loose = |a: Option<&str>, b: Option<&str>| normalize_for_compare(a) != normalize_for_compare(b);

    loose(
        row.parent_id.as_ref().map(ExternalId::as_str),
        record.parent_id.as_ref().map(ExternalId::as_str),
    ) || loose(row.size.as_deref(), record.size.as_deref())
        || loose(row.image_url.as_deref(), record.image_url.as_deref())
        || row.name.as_deref() != Some(record.name.as_str())
        || row.slug.as_deref() != Some(record.slug.as_str())
        || row.category_position != Some(record.category_position)
}
