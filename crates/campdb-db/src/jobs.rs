//! The Postgres-backed job queue.
//!
//! Jobs are plain rows; workers claim pending rows with `FOR UPDATE SKIP
//! LOCKED` so concurrent workers never double-claim. The queue has no native
//! pause, resume, or priority — the admin API simulates those by cancelling
//! and re-submitting, which intentionally discards queue position and attempt
//! history.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub queue: String,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts per status for one queue.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

const JOB_COLUMNS: &str = "id, public_id, queue, job_type, payload, status, attempts, \
     max_attempts, last_error, run_at, started_at, completed_at, created_at, updated_at";

/// Enqueues a new pending job and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn enqueue_job(
    pool: &PgPool,
    queue: &str,
    job_type: &str,
    payload: &serde_json::Value,
) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "INSERT INTO jobs (queue, job_type, payload) \
         VALUES ($1, $2, $3) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(queue)
    .bind(job_type)
    .bind(payload)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Returns a single job by queue and public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_job(
    pool: &PgPool,
    queue: &str,
    public_id: Uuid,
) -> Result<Option<JobRow>, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE queue = $1 AND public_id = $2"
    ))
    .bind(queue)
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists a queue's jobs, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(
    pool: &PgPool,
    queue: &str,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} \
         FROM jobs \
         WHERE queue = $1 AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3"
    ))
    .bind(queue)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Cancels a pending job by deleting its row.
///
/// Only `pending` jobs can be cancelled; returns `false` when the job was in
/// any other state (or already gone), leaving it untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn cancel_pending_job(pool: &PgPool, job_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND status = 'pending'")
        .bind(job_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Hard-deletes a job regardless of terminal status. The caller is responsible
/// for refusing deletion of `processing` jobs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_job(pool: &PgPool, job_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Claims up to `batch` due pending jobs for processing.
///
/// Uses `FOR UPDATE SKIP LOCKED` inside a single statement so concurrent
/// workers partition the queue without blocking each other. Claimed jobs move
/// to `processing` with `started_at` set and `attempts` incremented.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn claim_pending_jobs(
    pool: &PgPool,
    queue: &str,
    batch: i64,
) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs \
         SET status = 'processing', started_at = NOW(), attempts = attempts + 1, \
             updated_at = NOW() \
         WHERE id IN ( \
             SELECT id FROM jobs \
             WHERE queue = $1 AND status = 'pending' AND run_at <= NOW() \
             ORDER BY run_at, id \
             LIMIT $2 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(queue)
    .bind(batch)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks a processing job as completed.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `processing`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(pool: &PgPool, job_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'completed', completed_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id: job_id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Marks a processing job as failed, recording the error.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `processing`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(pool: &PgPool, job_id: i64, error: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'failed', last_error = $1, completed_at = NOW(), updated_at = NOW() \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(error)
    .bind(job_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id: job_id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Returns a processing job to `pending` after a transient failure, recording
/// the error and deferring the next attempt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_job(
    pool: &PgPool,
    job_id: i64,
    error: &str,
    retry_delay_secs: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE jobs \
         SET status = 'pending', last_error = $1, started_at = NULL, \
             run_at = NOW() + make_interval(secs => $2::DOUBLE PRECISION), \
             updated_at = NOW() \
         WHERE id = $3 AND status = 'processing'",
    )
    .bind(error)
    .bind(retry_delay_secs)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Aggregate per-status counts for one queue.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn queue_stats(pool: &PgPool, queue: &str) -> Result<QueueStats, DbError> {
    let row = sqlx::query_as::<_, QueueStats>(
        "SELECT COUNT(*) FILTER (WHERE status = 'pending')    AS pending, \
                COUNT(*) FILTER (WHERE status = 'processing') AS processing, \
                COUNT(*) FILTER (WHERE status = 'completed')  AS completed, \
                COUNT(*) FILTER (WHERE status = 'failed')     AS failed, \
                COUNT(*)                                      AS total \
         FROM jobs \
         WHERE queue = $1",
    )
    .bind(queue)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
