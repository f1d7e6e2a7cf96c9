//! Process-wide sync coordination shared by the HTTP routes and the scheduler.

use std::sync::Arc;

use catsync_core::{AppConfig, StaticDictionary};
use catsync_directus::{DirectusClient, DirectusConfig};
use catsync_engine::{CleanupStats, SyncEngine, SyncError, SyncPhase, SyncReport, SyncSettings};
use catsync_printful::{PrintfulClient, PrintfulClientConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Api,
    Schedule,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("a sync is already running")]
    Busy,

    #[error(transparent)]
    Failed(#[from] SyncError),

    #[error("sync task stopped before finishing: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Summary of the most recent finished run.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub trigger: Trigger,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub report: Option<SyncReport>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub running: bool,
    pub last_run: Option<LastRun>,
}

/// Owns the long-lived pieces of a sync run. The store client is built per
/// run so a dropped connection never outlives the run that opened it.
pub struct SyncRunner {
    source: PrintfulClient,
    store_config: DirectusConfig,
    dictionary: StaticDictionary,
    settings: SyncSettings,
    pub(crate) guard: Arc<Mutex<()>>,
    phase: watch::Sender<SyncPhase>,
    last_run: RwLock<Option<LastRun>>,
}

impl SyncRunner {
    /// Builds the catalog client and loads the dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be built or the
    /// dictionary file cannot be read.
    pub fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let source = PrintfulClient::new(&PrintfulClientConfig::from_app_config(config))?;
        let dictionary = match &config.dictionary_path {
            Some(path) => StaticDictionary::load(path)?,
            None => StaticDictionary::builtin(),
        };
        let (phase, _) = watch::channel(SyncPhase::Idle);

        Ok(Self {
            source,
            store_config: DirectusConfig::from_app_config(config),
            dictionary,
            settings: SyncSettings::from_app_config(config),
            guard: Arc::new(Mutex::new(())),
            phase,
            last_run: RwLock::new(None),
        })
    }

    /// Full sync. Fails fast with [`RunError::Busy`] while another run holds
    /// the guard.
    ///
    /// The run executes on its own task holding an owned guard, so dropping
    /// the returned future (a disconnected HTTP client) leaves it running to
    /// completion and still records [`LastRun`].
    ///
    /// # Errors
    ///
    /// [`RunError::Busy`], the run's [`SyncError`], or
    /// [`RunError::Interrupted`] if the task panicked.
    pub async fn run_sync(self: &Arc<Self>, trigger: Trigger) -> Result<SyncReport, RunError> {
        let running = Arc::clone(&self.guard)
            .try_lock_owned()
            .map_err(|_| RunError::Busy)?;
        let runner = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let _running = running;
            runner.execute(trigger).await
        });
        Ok(handle.await??)
    }

    async fn execute(&self, trigger: Trigger) -> Result<SyncReport, SyncError> {
        tracing::info!(trigger = ?trigger, "sync started");

        let result = match self.store() {
            Ok(store) => {
                SyncEngine::new(&self.source, &store, &self.dictionary, &self.settings)
                    .with_phase_sender(&self.phase)
                    .run_sync()
                    .await
            }
            Err(e) => {
                self.phase.send_replace(SyncPhase::Failed);
                Err(e)
            }
        };

        let last = LastRun {
            trigger,
            finished_at: Utc::now(),
            success: result.is_ok(),
            report: result.as_ref().ok().cloned(),
            error: result.as_ref().err().map(ToString::to_string),
        };
        *self.last_run.write().await = Some(last);

        result
    }

    /// Duplicate category repair, under the same guard as a sync.
    ///
    /// # Errors
    ///
    /// [`RunError::Busy`] or the cleanup's [`SyncError`].
    pub async fn cleanup_categories(&self) -> Result<CleanupStats, RunError> {
        let _running = self.guard.try_lock().map_err(|_| RunError::Busy)?;
        let store = self.store()?;
        let stats = SyncEngine::new(&self.source, &store, &self.dictionary, &self.settings)
            .with_phase_sender(&self.phase)
            .cleanup_categories()
            .await?;
        tracing::info!(
            groups = stats.groups,
            deleted = stats.deleted,
            failed = stats.failed,
            "category cleanup complete"
        );
        Ok(stats)
    }

    pub async fn status(&self) -> SyncStatus {
        let phase = *self.phase.borrow();
        let running = self.guard.try_lock().is_err();
        let last_run = self.last_run.read().await.clone();
        SyncStatus {
            phase,
            running,
            last_run,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    fn store(&self) -> Result<DirectusClient, SyncError> {
        Ok(DirectusClient::new(&self.store_config)?)
    }
}

/// Shared handle used by routes and scheduled jobs.
pub type SharedRunner = Arc<SyncRunner>;
