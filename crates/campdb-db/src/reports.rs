//! Database operations for `reports` and `report_schedules`.
//!
//! Report rows move `queued → processing → completed | failed`; the transition
//! functions are state-gated the same way the job queue's are, so a worker that
//! lost a race surfaces [`DbError::InvalidReportTransition`] instead of silently
//! double-processing.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: String,
    pub report_type: String,
    pub format: String,
    pub status: String,
    pub parameters: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `report_schedules` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportScheduleRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: String,
    pub report_type: String,
    pub format: String,
    pub frequency: String,
    pub recipients: Vec<String>,
    pub parameters: serde_json::Value,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const REPORT_COLUMNS: &str = "id, public_id, user_id, report_type, format, status, parameters, \
     result, error_message, completed_at, created_at, updated_at";

const SCHEDULE_COLUMNS: &str = "id, public_id, user_id, report_type, format, frequency, \
     recipients, parameters, is_active, last_run_at, next_run_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// reports operations
// ---------------------------------------------------------------------------

/// Creates a new report request in `queued` status and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_report(
    pool: &PgPool,
    user_id: &str,
    report_type: &str,
    format: &str,
    parameters: &serde_json::Value,
) -> Result<ReportRow, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "INSERT INTO reports (user_id, report_type, format, parameters) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {REPORT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(report_type)
    .bind(format)
    .bind(parameters)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Lists reports, newest first, optionally scoped to one user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reports(
    pool: &PgPool,
    user_id: Option<&str>,
    limit: i64,
) -> Result<Vec<ReportRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} \
         FROM reports \
         WHERE ($1::TEXT IS NULL OR user_id = $1) \
         ORDER BY created_at DESC \
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single report by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_report(pool: &PgPool, public_id: Uuid) -> Result<Option<ReportRow>, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Marks a report as `processing`.
///
/// # Errors
///
/// Returns [`DbError::InvalidReportTransition`] if the report is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_report(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE reports \
         SET status = 'processing', updated_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidReportTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a report as `completed` and stores the generated result payload.
///
/// # Errors
///
/// Returns [`DbError::InvalidReportTransition`] if the report is not
/// `processing`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_report(
    pool: &PgPool,
    id: i64,
    result_payload: &serde_json::Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE reports \
         SET status = 'completed', result = $1, completed_at = NOW(), updated_at = NOW() \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(result_payload)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidReportTransition {
            id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Marks a report as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_report(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE reports \
         SET status = 'failed', error_message = $1, completed_at = NOW(), updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// report_schedules operations
// ---------------------------------------------------------------------------

/// Creates a recurring report schedule. `next_run_at` is supplied by the caller
/// (typically "now plus one frequency interval").
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
#[allow(clippy::too_many_arguments)] // public API for full schedule creation
pub async fn create_report_schedule(
    pool: &PgPool,
    user_id: &str,
    report_type: &str,
    format: &str,
    frequency: &str,
    recipients: &[String],
    parameters: &serde_json::Value,
    next_run_at: DateTime<Utc>,
) -> Result<ReportScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ReportScheduleRow>(&format!(
        "INSERT INTO report_schedules \
           (user_id, report_type, format, frequency, recipients, parameters, next_run_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {SCHEDULE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(report_type)
    .bind(format)
    .bind(frequency)
    .bind(recipients)
    .bind(parameters)
    .bind(next_run_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Lists report schedules, optionally scoped to one user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_report_schedules(
    pool: &PgPool,
    user_id: Option<&str>,
) -> Result<Vec<ReportScheduleRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} \
         FROM report_schedules \
         WHERE ($1::TEXT IS NULL OR user_id = $1) \
         ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single report schedule by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_report_schedule(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<ReportScheduleRow>, DbError> {
    let row = sqlx::query_as::<_, ReportScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM report_schedules WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Sparse update of a report schedule; `None` preserves the existing value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
#[allow(clippy::too_many_arguments)] // mirrors the row's updatable fields
pub async fn update_report_schedule(
    pool: &PgPool,
    schedule_id: i64,
    format: Option<&str>,
    frequency: Option<&str>,
    recipients: Option<&[String]>,
    parameters: Option<&serde_json::Value>,
    is_active: Option<bool>,
    next_run_at: Option<DateTime<Utc>>,
) -> Result<ReportScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ReportScheduleRow>(&format!(
        "UPDATE report_schedules \
         SET format      = COALESCE($2, format), \
             frequency   = COALESCE($3, frequency), \
             recipients  = COALESCE($4, recipients), \
             parameters  = COALESCE($5, parameters), \
             is_active   = COALESCE($6, is_active), \
             next_run_at = COALESCE($7, next_run_at), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {SCHEDULE_COLUMNS}"
    ))
    .bind(schedule_id)
    .bind(format)
    .bind(frequency)
    .bind(recipients)
    .bind(parameters)
    .bind(is_active)
    .bind(next_run_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Disables a report schedule.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_report_schedule(pool: &PgPool, schedule_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE report_schedules SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
    )
    .bind(schedule_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns active schedules whose `next_run_at` has passed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_schedules(pool: &PgPool) -> Result<Vec<ReportScheduleRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} \
         FROM report_schedules \
         WHERE is_active AND next_run_at <= NOW() \
         ORDER BY next_run_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records a schedule run: sets `last_run_at = NOW()` and advances
/// `next_run_at` by one frequency interval (daily/weekly/monthly).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn advance_report_schedule(pool: &PgPool, schedule_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE report_schedules \
         SET last_run_at = NOW(), \
             next_run_at = NOW() + CASE frequency \
                 WHEN 'daily' THEN INTERVAL '1 day' \
                 WHEN 'weekly' THEN INTERVAL '7 days' \
                 ELSE INTERVAL '1 month' \
             END, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(schedule_id)
    .execute(pool)
    .await?;
    Ok(())
}
