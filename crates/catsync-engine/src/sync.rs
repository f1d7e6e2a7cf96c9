//! Sequencing of the category and product phases.

use std::fmt;

use catsync_core::{AppConfig, Dictionary, Locale};
use catsync_directus::TargetStore;
use catsync_printful::CatalogSource;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use crate::categories::CategoryReconciler;
use crate::error::SyncError;
use crate::products::ProductReconciler;
use crate::stats::{CategoryStats, CleanupStats, ProductStats, SyncReport};

/// Where a sync run currently is.
///
/// `Failed` is only entered from probing, fetching and category
/// reconciliation; product reconciliation degrades per item instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Probing,
    FetchingCategories,
    ReconcilingCategories,
    FetchingProducts,
    ReconcilingProducts,
    Done,
    Failed,
}

impl SyncPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::FetchingCategories => "fetching_categories",
            Self::ReconcilingCategories => "reconciling_categories",
            Self::FetchingProducts => "fetching_products",
            Self::ReconcilingProducts => "reconciling_products",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for one sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: u32,
    /// Pause after every product detail fetch.
    pub product_delay_ms: u64,
    pub detail_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
    /// Locale whose description column receives the resolved description.
    pub default_locale: Locale,
    /// Additional locales fetched from the source with a language header.
    pub translation_locales: Vec<Locale>,
    pub prune_stale_variants: bool,
    pub prune_categories: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            product_delay_ms: 250,
            detail_timeout_secs: 20,
            catalog_timeout_secs: 10,
            default_locale: Locale::En,
            translation_locales: Vec::new(),
            prune_stale_variants: false,
            prune_categories: false,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.page_size,
            product_delay_ms: config.product_delay_ms,
            detail_timeout_secs: config.detail_timeout_secs,
            catalog_timeout_secs: config.catalog_timeout_secs,
            default_locale: config.default_locale,
            translation_locales: config.translation_locales.clone(),
            prune_stale_variants: config.prune_stale_variants,
            prune_categories: config.prune_categories,
        }
    }
}

/// Runs the reconcilers in order against one source and one store.
///
/// Built per run: the store handle is acquired by the caller and released
/// when the engine is dropped.
pub struct SyncEngine<'a, C, S> {
    source: &'a C,
    store: &'a S,
    dictionary: &'a dyn Dictionary,
    settings: &'a SyncSettings,
    phase: Option<&'a watch::Sender<SyncPhase>>,
}

impl<'a, C: CatalogSource, S: TargetStore> SyncEngine<'a, C, S> {
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
            phase: None,
        }
    }

    /// Publishes phase transitions to `sender`.
    #[must_use]
    pub fn with_phase_sender(mut self, sender: &'a watch::Sender<SyncPhase>) -> Self {
        self.phase = Some(sender);
        self
    }

    fn enter(&self, phase: SyncPhase) {
        tracing::info!(phase = %phase, "sync phase");
        if let Some(sender) = self.phase {
            sender.send_replace(phase);
        }
    }

    fn fail(&self, phase: SyncPhase, error: SyncError) -> SyncError {
        self.enter(SyncPhase::Failed);
        let error = error.in_phase(phase);
        tracing::error!(phase = %phase, error = %error, "sync failed");
        error
    }

    /// Full run: probe, categories, then products.
    ///
    /// # Errors
    ///
    /// [`SyncError::Phase`] wrapping the cause when the probe, a fetch, or
    /// category reconciliation fails. The product phase never fails the run.
    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        self.probe().await?;
        let categories = self.category_phase().await?;
        let products = self.product_phase().await?;
        self.enter(SyncPhase::Done);

        let report = SyncReport {
            categories,
            products,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            categories_created = report.categories.created,
            categories_updated = report.categories.updated,
            categories_failed = report.categories.failed,
            products_created = report.products.created,
            products_updated = report.products.updated,
            products_deleted = report.products.deleted,
            products_failed = report.products.failed,
            "sync complete"
        );
        Ok(report)
    }

    /// Category phase only.
    ///
    /// # Errors
    ///
    /// As [`Self::run_sync`], for the probe and category phase.
    pub async fn run_categories(&self) -> Result<CategoryStats, SyncError> {
        self.probe().await?;
        let stats = self.category_phase().await?;
        self.enter(SyncPhase::Done);
        Ok(stats)
    }

    /// Product phase only. Assumes categories are already in place.
    ///
    /// # Errors
    ///
    /// As [`Self::run_sync`], for the probe and product list fetch.
    pub async fn run_products(&self) -> Result<ProductStats, SyncError> {
        self.probe().await?;
        let stats = self.product_phase().await?;
        self.enter(SyncPhase::Done);
        Ok(stats)
    }

    /// Duplicate category repair. Not part of [`Self::run_sync`].
    ///
    /// # Errors
    ///
    /// [`SyncError::Phase`] when the store cannot be probed or listed.
    pub async fn cleanup_categories(&self) -> Result<CleanupStats, SyncError> {
        self.probe().await?;
        let stats = CategoryReconciler::new(self.store)
            .cleanup_duplicates()
            .await
            .map_err(|e| self.fail(SyncPhase::ReconcilingCategories, e))?;
        self.enter(SyncPhase::Done);
        Ok(stats)
    }

    async fn probe(&self) -> Result<(), SyncError> {
        self.enter(SyncPhase::Probing);
        self.store
            .probe()
            .await
            .map_err(|e| self.fail(SyncPhase::Probing, e.into()))
    }

    async fn category_phase(&self) -> Result<CategoryStats, SyncError> {
        self.enter(SyncPhase::FetchingCategories);
        let source = self
            .source
            .fetch_categories()
            .await
            .map_err(|e| self.fail(SyncPhase::FetchingCategories, e.into()))?;
        tracing::info!(
            count = source.items.len(),
            quarantined = source.quarantine.ids.len() + source.quarantine.unidentified,
            "fetched source categories"
        );

        self.enter(SyncPhase::ReconcilingCategories);
        CategoryReconciler::new(self.store)
            .with_pruning(self.settings.prune_categories)
            .reconcile(&source)
            .await
            .map_err(|e| self.fail(SyncPhase::ReconcilingCategories, e))
    }

    async fn product_phase(&self) -> Result<ProductStats, SyncError> {
        self.enter(SyncPhase::FetchingProducts);
        let source = self
            .source
            .fetch_product_list(self.settings.page_size)
            .await
            .map_err(|e| self.fail(SyncPhase::FetchingProducts, e.into()))?;
        tracing::info!(
            count = source.items.len(),
            quarantined = source.quarantine.ids.len() + source.quarantine.unidentified,
            "fetched source products"
        );

        self.enter(SyncPhase::ReconcilingProducts);
        Ok(
            ProductReconciler::new(self.source, self.store, self.dictionary, self.settings)
                .reconcile(&source)
                .await,
        )
    }
}
