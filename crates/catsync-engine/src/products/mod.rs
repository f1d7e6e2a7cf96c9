//! Product and variant reconciliation.
//!
//! Products are processed one at a time. Each one is fetched in full, mapped,
//! merged with any curated values already in the store, and written before
//! its variants are reconciled. Failures are scoped to the product (or
//! variant) they happened in. Orphans are pruned only after the whole list
//! has been processed.

mod mapping;
mod variants;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use catsync_core::{Dictionary, ExternalId, ItemId, Locale, PLACEHOLDER_KEY};
use catsync_directus::{categories, products, ProductRecord, TargetProduct, TargetStore};
use catsync_printful::{CatalogSource, Listing, SourceError, SourceProduct, SourceProductDetail};
use chrono::Utc;

use crate::dedup::{create_unless_exists, existing_product, Guarded};
use crate::description::{localized_description, resolve_description};
use crate::error::ItemError;
use crate::merge::{merge_product, product_differs};
use crate::stats::{Outcome, ProductStats};
use crate::sync::SyncSettings;

pub use mapping::{mockup_images, parse_price, product_price, LocaleDescriptions};

/// Fallback when the dictionary has no placeholder for the default locale.
const DEFAULT_PLACEHOLDER: &str = "Product description coming soon.";

/// Reconciles source products into `products` and `variants`.
pub struct ProductReconciler<'a, C, S> {
    source: &'a C,
    store: &'a S,
    dictionary: &'a dyn Dictionary,
    settings: &'a SyncSettings,
}

/// Per-run lookups. Both are hints; writes always re-check the store.
#[derive(Default)]
struct RunCache {
    products: HashMap<ExternalId, TargetProduct>,
    categories: HashMap<ExternalId, Option<ItemId>>,
}

impl<'a, C: CatalogSource, S: TargetStore> ProductReconciler<'a, C, S> {
    #[must_use]
    pub fn new(
        source: &'a C,
        store: &'a S,
        dictionary: &'a dyn Dictionary,
        settings: &'a SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            dictionary,
            settings,
        }
    }

    /// Reconciles every product in `listing`, then prunes orphans.
    ///
    /// `listing` must be complete: any stored product that is neither listed
    /// nor quarantined is deleted. Never fails as a whole; see
    /// [`ProductStats::failed`].
    pub async fn reconcile(&self, listing: &Listing<SourceProduct>) -> ProductStats {
        let source = listing.items.as_slice();
        let mut stats = ProductStats::default();
        let mut cache = RunCache::default();

        match products::list_all(self.store).await {
            Ok(rows) => {
                for row in rows {
                    if let Some(id) = row.printful_id.clone() {
                        cache.products.entry(id).or_insert(row);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "product index unavailable, relying on per-product rechecks");
            }
        }

        for summary in source {
            match self.reconcile_one(summary, &mut cache, &mut stats).await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        external_id = %summary.id,
                        error = %e,
                        "product reconciliation failed"
                    );
                }
            }

            if self.settings.product_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.product_delay_ms)).await;
            }
        }

        self.prune_orphans(listing, &mut stats).await;

        tracing::info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            deleted = stats.deleted,
            failed = stats.failed,
            variants_created = stats.variants.created,
            variants_updated = stats.variants.updated,
            variants_failed = stats.variants.failed,
            "products reconciled"
        );
        stats
    }

    async fn reconcile_one(
        &self,
        summary: &SourceProduct,
        cache: &mut RunCache,
        stats: &mut ProductStats,
    ) -> Result<Outcome, ItemError> {
        let detail = self.fetch_detail(&summary.id, None).await?;
        let Some(product) = detail.sync_product.as_ref() else {
            return Err(ItemError::MissingProduct);
        };

        let catalog = match detail
            .sync_variants
            .first()
            .and_then(|v| v.catalog_product_id())
        {
            Some(catalog_id) => {
                bounded(
                    self.settings.catalog_timeout_secs,
                    self.source.fetch_catalog_description(catalog_id),
                )
                .await
                .flatten()
            }
            None => None,
        };

        let placeholder = self
            .dictionary
            .lookup(self.settings.default_locale, PLACEHOLDER_KEY)
            .unwrap_or(DEFAULT_PLACEHOLDER);
        let description = resolve_description(catalog.as_ref(), &detail, placeholder);

        let mut locales = LocaleDescriptions::default();
        locales.set(self.settings.default_locale, Some(description.clone()));
        for &locale in &self.settings.translation_locales {
            if locale != self.settings.default_locale {
                locales.set(locale, self.fetch_translation(&summary.id, locale).await);
            }
        }

        let main_category = match mapping::declared_category(&detail.sync_variants) {
            Some(category_id) => self.resolve_category(category_id, cache).await,
            None => None,
        };

        let fresh = mapping::product_record(mapping::ProductInputs {
            summary,
            product,
            variants: &detail.sync_variants,
            description,
            locales,
            main_category,
        });

        let (outcome, product_id) = self.upsert_product(summary, fresh, cache).await?;

        if let Some(product_id) = product_id {
            variants::reconcile_variants(
                self.store,
                &product_id,
                &detail.sync_variants,
                &detail.quarantined_variants,
                self.settings.prune_stale_variants,
                &mut stats.variants,
            )
            .await;
        }

        Ok(outcome)
    }

    /// Writes the product and returns the id its variants should hang off.
    async fn upsert_product(
        &self,
        summary: &SourceProduct,
        fresh: ProductRecord,
        cache: &mut RunCache,
    ) -> Result<(Outcome, Option<ItemId>), ItemError> {
        if let Some(existing) = cache.products.get(&summary.id) {
            let outcome = self.update_if_changed(existing, fresh).await?;
            return Ok((outcome, Some(existing.id.clone())));
        }

        let created = ProductRecord {
            date_created: Some(Utc::now()),
            ..fresh.clone()
        };
        let guarded = create_unless_exists(existing_product(self.store, &summary.id), || {
            products::create(self.store, &created)
        })
        .await?;

        match guarded {
            Guarded::Existing(existing) => {
                let outcome = self.update_if_changed(&existing, fresh).await?;
                let id = existing.id.clone();
                cache.products.insert(summary.id.clone(), existing);
                Ok((outcome, Some(id)))
            }
            Guarded::Created(row) => {
                tracing::debug!(external_id = %summary.id, id = %row.id, "product created");
                let id = row.id.clone();
                cache.products.insert(summary.id.clone(), row);
                Ok((Outcome::Created, Some(id)))
            }
            Guarded::LostRace => {
                tracing::debug!(external_id = %summary.id, "product created concurrently, skipping");
                let winner = existing_product(self.store, &summary.id).await?;
                Ok((Outcome::Skipped, winner.map(|row| row.id)))
            }
        }
    }

    async fn update_if_changed(
        &self,
        existing: &TargetProduct,
        fresh: ProductRecord,
    ) -> Result<Outcome, ItemError> {
        let merged = merge_product(existing, fresh);
        if !product_differs(existing, &merged) {
            return Ok(Outcome::Skipped);
        }
        let record = ProductRecord {
            date_updated: Some(Utc::now()),
            ..merged
        };
        products::update(self.store, &existing.id, &record).await?;
        tracing::debug!(external_id = %record.printful_id, id = %existing.id, "product updated");
        Ok(Outcome::Updated)
    }

    async fn fetch_detail(
        &self,
        product_id: &ExternalId,
        locale: Option<Locale>,
    ) -> Result<SourceProductDetail, SourceError> {
        let secs = self.settings.detail_timeout_secs;
        bounded(secs, self.source.fetch_product_detail(product_id, locale))
            .await
            .ok_or_else(|| SourceError::Timeout {
                context: format!("store product {product_id}"),
                secs,
            })?
    }

    /// Localized description for one extra locale; `None` on any failure.
    async fn fetch_translation(&self, product_id: &ExternalId, locale: Locale) -> Option<String> {
        match self.fetch_detail(product_id, Some(locale)).await {
            Ok(detail) => localized_description(&detail),
            Err(e) => {
                tracing::debug!(
                    external_id = %product_id,
                    locale = %locale,
                    error = %e,
                    "translated detail unavailable"
                );
                None
            }
        }
    }

    /// Store id of the category with `printful_id`, if one exists.
    async fn resolve_category(
        &self,
        printful_id: &ExternalId,
        cache: &mut RunCache,
    ) -> Option<ItemId> {
        if let Some(hit) = cache.categories.get(printful_id) {
            return hit.clone();
        }
        match categories::find_by_printful_id(self.store, printful_id).await {
            Ok(rows) => {
                let id = rows.into_iter().next().map(|row| row.id);
                cache.categories.insert(printful_id.clone(), id.clone());
                id
            }
            Err(e) => {
                tracing::warn!(
                    category = %printful_id,
                    error = %e,
                    "category lookup failed, leaving product uncategorized"
                );
                None
            }
        }
    }

    /// Deletes products absent from `listing` and products with no
    /// `printful_id`. Quarantined ids are kept. Skipped entirely for an empty
    /// listing or one with unidentifiable malformed entries.
    async fn prune_orphans(&self, listing: &Listing<SourceProduct>, stats: &mut ProductStats) {
        if listing.items.is_empty() {
            tracing::warn!("source returned no products, skipping orphan pruning");
            return;
        }
        if listing.quarantine.blocks_pruning() {
            tracing::warn!(
                unidentified = listing.quarantine.unidentified,
                "malformed products without ids, skipping orphan pruning"
            );
            return;
        }

        let rows = match products::list_all(self.store).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "could not list products, skipping orphan pruning");
                return;
            }
        };

        let live: HashSet<&ExternalId> = listing.items.iter().map(|p| &p.id).collect();
        for row in rows {
            let orphaned = row
                .printful_id
                .as_ref()
                .is_none_or(|id| !live.contains(id) && !listing.quarantine.contains(id));
            if !orphaned {
                continue;
            }
            match products::delete(self.store, &row.id).await {
                Ok(()) => {
                    stats.deleted += 1;
                    tracing::info!(
                        id = %row.id,
                        external_id = ?row.printful_id.as_ref().map(ExternalId::as_str),
                        "orphaned product deleted"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(id = %row.id, error = %e, "orphaned product delete failed");
                }
            }
        }
    }
}

/// Races `future` against a timeout; `None` when the timeout wins.
async fn bounded<F: Future>(secs: u64, future: F) -> Option<F::Output> {
    tokio::time::timeout(Duration::from_secs(secs), future)
        .await
        .ok()
}
