//! Admin control over the Postgres job queue.
//!
//! The queue itself has no pause/resume/priority, so these operations are
//! simulated: pause cancels a pending job, resume and retry re-submit a failed
//! job as a fresh one, and promote cancels and re-submits a pending job with
//! `run_at = NOW()`. Re-submission always produces a new job id and resets the
//! attempt counter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campdb_db::JobRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
    id: Uuid,
    queue: String,
    job_type: String,
    payload: serde_json::Value,
    status: String,
    attempts: i32,
    max_attempts: i32,
    last_error: Option<String>,
    run_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    can_be_paused: bool,
    can_be_resumed: bool,
    can_be_retried: bool,
    can_be_promoted: bool,
    can_be_removed: bool,
}

impl From<JobRow> for JobItem {
    fn from(row: JobRow) -> Self {
        let pending = row.status == "pending";
        let failed = row.status == "failed";
        let processing = row.status == "processing";
        Self {
            id: row.public_id,
            queue: row.queue,
            job_type: row.job_type,
            payload: row.payload,
            status: row.status,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            run_at: row.run_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            can_be_paused: pending,
            can_be_resumed: failed,
            can_be_retried: failed,
            can_be_promoted: pending,
            can_be_removed: !processing,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct QueueStatsBody {
    queue: String,
    pending: i64,
    processing: i64,
    completed: i64,
    failed: i64,
    total: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct JobListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

fn validate_job_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "pending" | "processing" | "completed" | "failed" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "status must be 'pending', 'processing', 'completed', or 'failed', got '{value}'"
            ),
        )),
    }
}

async fn resolve_job(
    state: &AppState,
    rid: &str,
    queue: &str,
    public_id: Uuid,
) -> Result<JobRow, ApiError> {
    campdb_db::get_job(&state.pool, queue, public_id)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "job not found"))
}

fn wrong_state_error(rid: &str, action: &str, expected: &str, row: &JobRow) -> ApiError {
    ApiError::new(
        rid,
        "validation_error",
        format!("only {expected} jobs can be {action}"),
    )
    .with_details(serde_json::json!({ "job_state": row.status }))
}

/// GET /api/v1/admin/queues/{queue}/stats
pub(super) async fn queue_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(queue): Path<String>,
) -> Result<Json<ApiResponse<QueueStatsBody>>, ApiError> {
    let stats = campdb_db::queue_stats(&state.pool, &queue)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: QueueStatsBody {
            queue,
            pending: stats.pending,
            processing: stats.processing,
            completed: stats.completed,
            failed: stats.failed,
            total: stats.total,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/admin/queues/{queue}/jobs
pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(queue): Path<String>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<ApiResponse<Vec<JobItem>>>, ApiError> {
    let rid = &req_id.0;
    if let Some(status) = &query.status {
        validate_job_status(rid, status)?;
    }

    let rows = campdb_db::list_jobs(
        &state.pool,
        &queue,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(JobItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/admin/queues/{queue}/jobs/{id}
pub(super) async fn job_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let row = resolve_job(&state, &req_id.0, &queue, id).await?;

    Ok(Json(ApiResponse {
        data: JobItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/queues/{queue}/jobs/{id}/pause
///
/// The queue has no held state, so pausing a pending job cancels it outright.
/// Processing jobs cannot be interrupted.
pub(super) async fn pause_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let row = resolve_job(&state, rid, &queue, id).await?;

    if row.status != "pending" {
        return Err(wrong_state_error(rid, "paused", "pending", &row));
    }

    let cancelled = campdb_db::cancel_pending_job(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !cancelled {
        // Lost a race with a worker that just claimed it.
        return Err(ApiError::new(
            rid,
            "conflict",
            "job was claimed before it could be paused",
        ));
    }

    tracing::info!(queue = %queue, job = %id, "job paused (cancelled)");
    Ok(StatusCode::OK)
}

/// POST /api/v1/admin/queues/{queue}/jobs/{id}/resume
pub(super) async fn resume_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    resubmit_failed(state, req_id, queue, id, "resumed").await
}

/// POST /api/v1/admin/queues/{queue}/jobs/{id}/retry
pub(super) async fn retry_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    resubmit_failed(state, req_id, queue, id, "retried").await
}

/// Resume and retry share one implementation: delete the failed job and
/// enqueue a fresh copy of its payload.
async fn resubmit_failed(
    state: AppState,
    req_id: RequestId,
    queue: String,
    id: Uuid,
    action: &str,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let rid = &req_id.0;
    let row = resolve_job(&state, rid, &queue, id).await?;

    if row.status != "failed" {
        return Err(wrong_state_error(rid, action, "failed", &row));
    }

    campdb_db::delete_job(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let fresh = campdb_db::enqueue_job(&state.pool, &row.queue, &row.job_type, &row.payload)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(queue = %queue, old = %id, new = %fresh.public_id, "failed job {action}");

    Ok(Json(ApiResponse {
        data: JobItem::from(fresh),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/queues/{queue}/jobs/{id}/promote
///
/// Cancels a pending job and re-submits it with `run_at = NOW()`, moving it to
/// the front of the due set.
pub(super) async fn promote_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let rid = &req_id.0;
    let row = resolve_job(&state, rid, &queue, id).await?;

    if row.status != "pending" {
        return Err(wrong_state_error(rid, "promoted", "pending", &row));
    }

    let cancelled = campdb_db::cancel_pending_job(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !cancelled {
        return Err(ApiError::new(
            rid,
            "conflict",
            "job was claimed before it could be promoted",
        ));
    }

    let fresh = campdb_db::enqueue_job(&state.pool, &row.queue, &row.job_type, &row.payload)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(queue = %queue, old = %id, new = %fresh.public_id, "job promoted");

    Ok(Json(ApiResponse {
        data: JobItem::from(fresh),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/admin/queues/{queue}/jobs/{id}
pub(super) async fn remove_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((queue, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let row = resolve_job(&state, rid, &queue, id).await?;

    if row.status == "processing" {
        return Err(wrong_state_error(rid, "removed", "non-processing", &row));
    }

    campdb_db::delete_job(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}
