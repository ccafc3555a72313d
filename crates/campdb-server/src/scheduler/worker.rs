//! The `reports` queue worker.
//!
//! Every thirty seconds the worker claims a batch of due pending jobs (the
//! claim uses `FOR UPDATE SKIP LOCKED`, so multiple server instances share the
//! queue safely) and generates the requested report payloads. A failed attempt
//! releases the job back to pending with a delay until `max_attempts` is
//! reached, after which both the job and its report are marked failed.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use campdb_db::{DbError, JobRow};

use crate::api::REPORTS_QUEUE;

const BASE_RETRY_DELAY_SECS: i64 = 30;
const MAX_RETRY_DELAY_SECS: i64 = 900;

/// Register the queue worker, running every thirty seconds.
pub(super) async fn register_queue_worker_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<campdb_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("*/30 * * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let batch = config.worker_batch_size;

        Box::pin(async move {
            run_queue_pass(&pool, batch).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// One worker pass: claim a batch and process each job to completion.
pub(crate) async fn run_queue_pass(pool: &PgPool, batch: i64) {
    let jobs = match campdb_db::claim_pending_jobs(pool, REPORTS_QUEUE, batch).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "worker: failed to claim jobs");
            return;
        }
    };

    if jobs.is_empty() {
        return;
    }

    tracing::info!(count = jobs.len(), "worker: claimed jobs");

    for job in jobs {
        match process_job(pool, &job).await {
            Ok(()) => {
                if let Err(e) = campdb_db::complete_job(pool, job.id).await {
                    tracing::error!(job = %job.public_id, error = %e, "worker: failed to complete job");
                }
            }
            Err(e) => handle_failure(pool, &job, &e.to_string()).await,
        }
    }
}

/// Generate the report a `generate_report` job points at.
async fn process_job(pool: &PgPool, job: &JobRow) -> Result<(), DbError> {
    let report_id = job
        .payload
        .get("report_id")
        .and_then(serde_json::Value::as_i64)
        .ok_or(DbError::NotFound)?;

    match campdb_db::start_report(pool, report_id).await {
        Ok(()) => {}
        // A released job that already started its report finds it in
        // processing on the next attempt.
        Err(DbError::InvalidReportTransition { .. }) => {}
        Err(e) => return Err(e),
    }

    let payload = generate_rollup_payload(pool).await?;
    campdb_db::complete_report(pool, report_id, &payload).await?;

    tracing::info!(job = %job.public_id, report_id, "worker: report generated");
    Ok(())
}

/// Build the campaign-rollup payload stored in `reports.result`.
async fn generate_rollup_payload(pool: &PgPool) -> Result<serde_json::Value, DbError> {
    let overview = campdb_db::overview(pool).await?;
    let rollups = campdb_db::active_campaign_rollups(pool).await?;

    let campaigns: Vec<serde_json::Value> = rollups
        .iter()
        .map(|r| {
            serde_json::json!({
                "campaign_id": r.campaign_id,
                "schedules_planned": r.schedules_planned,
                "schedules_published": r.schedules_published,
                "schedules_cancelled": r.schedules_cancelled,
                "content_count": r.content_count,
                "budget_allocated": r.budget_allocated,
                "budget_spent": r.budget_spent,
                "reach_actual": r.reach_actual,
                "engagement_actual": r.engagement_actual,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "generated_at": chrono::Utc::now(),
        "overview": {
            "active_campaigns": overview.active_campaigns,
            "active_brands": overview.active_brands,
            "published_content": overview.published_content,
            "total_reach": overview.total_reach,
            "total_engagement": overview.total_engagement,
        },
        "campaigns": campaigns,
    }))
}

/// Release the job for another attempt, or fail it once attempts run out.
async fn handle_failure(pool: &PgPool, job: &JobRow, error: &str) {
    if job.attempts < job.max_attempts {
        let delay = retry_delay_secs(job.attempts);
        tracing::warn!(
            job = %job.public_id,
            attempt = job.attempts,
            delay_secs = delay,
            error,
            "worker: job failed, releasing for retry"
        );
        if let Err(e) = campdb_db::release_job(pool, job.id, error, delay).await {
            tracing::error!(job = %job.public_id, error = %e, "worker: failed to release job");
        }
        return;
    }

    tracing::error!(
        job = %job.public_id,
        attempts = job.attempts,
        error,
        "worker: job failed permanently"
    );
    if let Err(e) = campdb_db::fail_job(pool, job.id, error).await {
        tracing::error!(job = %job.public_id, error = %e, "worker: failed to mark job failed");
    }
    if let Some(report_id) = job
        .payload
        .get("report_id")
        .and_then(serde_json::Value::as_i64)
    {
        if let Err(e) = campdb_db::fail_report(pool, report_id, error).await {
            tracing::error!(report_id, error = %e, "worker: failed to mark report failed");
        }
    }
}

/// Doubling backoff from the base delay, capped.
fn retry_delay_secs(attempts: i32) -> i64 {
    let shift = attempts.clamp(1, 6) - 1;
    (BASE_RETRY_DELAY_SECS << shift).min(MAX_RETRY_DELAY_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay_secs(1), 30);
        assert_eq!(retry_delay_secs(2), 60);
        assert_eq!(retry_delay_secs(3), 120);
        assert_eq!(retry_delay_secs(6), 900);
        assert_eq!(retry_delay_secs(50), 900);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn queue_pass_completes_a_report(pool: sqlx::PgPool) {
        let report = campdb_db::create_report(
            &pool,
            "maria",
            "campaign_performance",
            "json",
            &serde_json::json!({}),
        )
        .await
        .expect("create report");
        campdb_db::enqueue_job(
            &pool,
            REPORTS_QUEUE,
            crate::api::GENERATE_REPORT_JOB,
            &serde_json::json!({ "report_id": report.id }),
        )
        .await
        .expect("enqueue");

        run_queue_pass(&pool, 10).await;

        let done = campdb_db::get_report(&pool, report.public_id)
            .await
            .expect("lookup")
            .expect("report row");
        assert_eq!(done.status, "completed");
        let result = done.result.expect("result payload");
        assert!(result["overview"]["active_campaigns"].is_number());
        assert!(result["campaigns"].is_array());

        let stats = campdb_db::queue_stats(&pool, REPORTS_QUEUE)
            .await
            .expect("stats");
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn job_without_a_report_eventually_fails(pool: sqlx::PgPool) {
        campdb_db::enqueue_job(
            &pool,
            REPORTS_QUEUE,
            crate::api::GENERATE_REPORT_JOB,
            &serde_json::json!({ "report_id": 999_999 }),
        )
        .await
        .expect("enqueue");

        // Exhaust the attempts; released jobs come back with a delay, so
        // clear run_at between passes.
        for _ in 0..5 {
            run_queue_pass(&pool, 10).await;
            sqlx::query("UPDATE jobs SET run_at = NOW() WHERE status = 'pending'")
                .execute(&pool)
                .await
                .expect("reset run_at");
        }

        let stats = campdb_db::queue_stats(&pool, REPORTS_QUEUE)
            .await
            .expect("stats");
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
    }
}
