//! Command handlers. Every handler builds its engine from the shared
//! [`Context`] and prints a one-line summary (or JSON with `--json`).

use catsync_core::{AppConfig, StaticDictionary};
use catsync_directus::{DirectusClient, DirectusConfig, TargetStore};
use catsync_engine::{
    CategoryStats, CleanupStats, ProductStats, SyncEngine, SyncReport, SyncSettings,
};
use catsync_printful::{PrintfulClient, PrintfulClientConfig};

use crate::Phase;

pub(crate) struct Context {
    source: PrintfulClient,
    store: DirectusClient,
    dictionary: StaticDictionary,
    settings: SyncSettings,
}

impl Context {
    pub(crate) fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let dictionary = match &config.dictionary_path {
            Some(path) => StaticDictionary::load(path)?,
            None => StaticDictionary::builtin(),
        };
        Ok(Self {
            source: PrintfulClient::new(&PrintfulClientConfig::from_app_config(config))?,
            store: DirectusClient::new(&DirectusConfig::from_app_config(config))?,
            dictionary,
            settings: SyncSettings::from_app_config(config),
        })
    }

    fn engine(&self) -> SyncEngine<'_, PrintfulClient, DirectusClient> {
        SyncEngine::new(&self.source, &self.store, &self.dictionary, &self.settings)
    }
}

/// # Errors
///
/// Returns an error when the run aborts (probe, fetch, or category phase).
/// Per-item failures only show up in the printed counts.
pub(crate) async fn run_sync(ctx: &Context, phase: Phase, json: bool) -> anyhow::Result<()> {
    let engine = ctx.engine();
    match phase {
        Phase::All => {
            let report = engine.run_sync().await?;
            emit(json, &report, || format_report(&report))
        }
        Phase::Categories => {
            let stats = engine.run_categories().await?;
            emit(json, &stats, || format_categories(&stats))
        }
        Phase::Products => {
            let stats = engine.run_products().await?;
            emit(json, &stats, || format_products(&stats))
        }
    }
}

/// # Errors
///
/// Returns an error if the store cannot be probed or listed.
pub(crate) async fn run_cleanup(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let stats = ctx.engine().cleanup_categories().await?;
    emit(json, &stats, || format_cleanup(&stats))
}

/// # Errors
///
/// Returns the first upstream that cannot be reached.
pub(crate) async fn run_check(ctx: &Context) -> anyhow::Result<()> {
    ctx.store.probe().await?;
    println!("directus: ok");

    let categories = ctx.source.fetch_categories().await?;
    println!("printful: ok ({} categories)", categories.items.len());
    Ok(())
}

fn emit<T: serde::Serialize>(
    json: bool,
    value: &T,
    summary: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", summary());
    }
    Ok(())
}

pub(crate) fn format_categories(stats: &CategoryStats) -> String {
    format!(
        "categories: {} created, {} updated, {} unchanged, {} deleted, {} failed",
        stats.created, stats.updated, stats.skipped, stats.deleted, stats.failed
    )
}

pub(crate) fn format_products(stats: &ProductStats) -> String {
    let v = &stats.variants;
    format!(
        "products: {} created, {} updated, {} unchanged, {} deleted, {} failed \
         (variants: {} created, {} updated, {} deleted, {} failed)",
        stats.created,
        stats.updated,
        stats.skipped,
        stats.deleted,
        stats.failed,
        v.created,
        v.updated,
        v.deleted,
        v.failed
    )
}

pub(crate) fn format_report(report: &SyncReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    format!(
        "{}\n{}\nfinished in {}s",
        format_categories(&report.categories),
        format_products(&report.products),
        elapsed.num_seconds()
    )
}

pub(crate) fn format_cleanup(stats: &CleanupStats) -> String {
    format!(
        "cleanup: {} duplicated ids, {} rows deleted, {} failed",
        stats.groups, stats.deleted, stats.failed
    )
}
