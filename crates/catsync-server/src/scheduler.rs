//! Background job scheduler.
//!
//! Registers the recurring sync when `CATSYNC_SYNC_CRON` is set. Scheduled
//! runs go through the same [`SyncRunner`](crate::runner::SyncRunner) guard as
//! API triggers, so a tick that lands on a running sync is skipped.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runner::{RunError, SharedRunner, Trigger};

/// Builds and starts the scheduler, or returns `None` when no schedule is
/// configured.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    runner: SharedRunner,
    cron: Option<&str>,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(cron) = cron else {
        tracing::info!("scheduler: CATSYNC_SYNC_CRON not set; scheduled sync disabled");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    register_sync_job(&scheduler, runner, cron).await?;
    scheduler.start().await?;
    tracing::info!(cron, "scheduler: scheduled sync registered");
    Ok(Some(scheduler))
}

async fn register_sync_job(
    scheduler: &JobScheduler,
    runner: SharedRunner,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            tracing::info!("scheduler: starting scheduled sync");
            match runner.run_sync(Trigger::Schedule).await {
                Ok(report) => tracing::info!(
                    products_created = report.products.created,
                    products_updated = report.products.updated,
                    products_failed = report.products.failed,
                    "scheduler: scheduled sync complete"
                ),
                Err(RunError::Busy) => {
                    tracing::warn!("scheduler: previous sync still running; skipping tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: scheduled sync failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
