//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers two
//! recurring jobs: the report-schedule dispatcher and the queue worker.

mod worker;

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::{GENERATE_REPORT_JOB, REPORTS_QUEUE};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<campdb_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_schedule_dispatch_job(&scheduler, pool.clone()).await?;
    worker::register_queue_worker_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the report-schedule dispatcher.
///
/// Runs every five minutes (`0 */5 * * * *`). Each due schedule produces a
/// queued report row plus a `generate_report` job, then has its `next_run_at`
/// advanced by one frequency interval.
async fn register_schedule_dispatch_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            run_schedule_dispatch(&pool).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Dispatch every due report schedule.
async fn run_schedule_dispatch(pool: &PgPool) {
    let due = match campdb_db::list_due_schedules(pool).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load due report schedules");
            return;
        }
    };

    if due.is_empty() {
        return;
    }

    tracing::info!(count = due.len(), "scheduler: dispatching due report schedules");

    for schedule in &due {
        dispatch_schedule(pool, schedule).await;
    }
}

/// Queue one scheduled report and advance the schedule.
async fn dispatch_schedule(pool: &PgPool, schedule: &campdb_db::ReportScheduleRow) {
    let report = match campdb_db::create_report(
        pool,
        &schedule.user_id,
        &schedule.report_type,
        &schedule.format,
        &schedule.parameters,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                schedule = %schedule.public_id,
                error = %e,
                "scheduler: failed to create scheduled report"
            );
            return;
        }
    };

    if let Err(e) = campdb_db::enqueue_job(
        pool,
        REPORTS_QUEUE,
        GENERATE_REPORT_JOB,
        &serde_json::json!({ "report_id": report.id }),
    )
    .await
    {
        tracing::error!(
            schedule = %schedule.public_id,
            report = %report.public_id,
            error = %e,
            "scheduler: failed to enqueue generation job"
        );
        return;
    }

    // Advance even though generation has not run yet; the queue owns the
    // report from here, and a stuck schedule must not re-fire every pass.
    if let Err(e) = campdb_db::advance_report_schedule(pool, schedule.id).await {
        tracing::error!(
            schedule = %schedule.public_id,
            error = %e,
            "scheduler: failed to advance schedule"
        );
        return;
    }

    tracing::info!(
        schedule = %schedule.public_id,
        report = %report.public_id,
        "scheduler: scheduled report queued"
    );
}
