//! Report requests and recurring report schedules.
//!
//! Creating a report also enqueues a `generate_report` job on the `reports`
//! queue; the background worker picks it up and fills in `result`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

pub(crate) const REPORTS_QUEUE: &str = "reports";
pub(crate) const GENERATE_REPORT_JOB: &str = "generate_report";

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ReportItem {
    id: Uuid,
    user_id: String,
    report_type: String,
    format: String,
    status: String,
    parameters: serde_json::Value,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::ReportRow> for ReportItem {
    fn from(row: campdb_db::ReportRow) -> Self {
        Self {
            id: row.public_id,
            user_id: row.user_id,
            report_type: row.report_type,
            format: row.format,
            status: row.status,
            parameters: row.parameters,
            result: row.result,
            error_message: row.error_message,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ReportScheduleItem {
    id: Uuid,
    user_id: String,
    report_type: String,
    format: String,
    frequency: String,
    recipients: Vec<String>,
    parameters: serde_json::Value,
    is_active: bool,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::ReportScheduleRow> for ReportScheduleItem {
    fn from(row: campdb_db::ReportScheduleRow) -> Self {
        Self {
            id: row.public_id,
            user_id: row.user_id,
            report_type: row.report_type,
            format: row.format,
            frequency: row.frequency,
            recipients: row.recipients,
            parameters: row.parameters,
            is_active: row.is_active,
            last_run_at: row.last_run_at,
            next_run_at: row.next_run_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ReportListQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleListQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateReportRequest {
    pub user_id: String,
    pub report_type: String,
    pub format: Option<String>,
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateReportScheduleRequest {
    pub user_id: String,
    pub report_type: String,
    pub format: Option<String>,
    pub frequency: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateReportScheduleRequest {
    pub format: Option<String>,
    pub frequency: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub parameters: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_report_type(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "campaign_performance" | "brand_summary" | "platform_overview" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "report_type must be 'campaign_performance', 'brand_summary', or \
                 'platform_overview', got '{value}'"
            ),
        )),
    }
}

fn validate_format(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "json" | "csv" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("format must be 'json' or 'csv', got '{value}'"),
        )),
    }
}

fn validate_frequency(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "daily" | "weekly" | "monthly" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("frequency must be 'daily', 'weekly', or 'monthly', got '{value}'"),
        )),
    }
}

fn next_run_after(frequency: &str, from: DateTime<Utc>) -> DateTime<Utc> {
    match frequency {
        "daily" => from + Duration::days(1),
        "weekly" => from + Duration::days(7),
        _ => from + Duration::days(30),
    }
}

// ---------------------------------------------------------------------------
// reports handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/reports — queue a report for generation.
pub(super) async fn create_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportItem>>), ApiError> {
    let rid = &req_id.0;

    if body.user_id.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "user_id is required"));
    }
    validate_report_type(rid, &body.report_type)?;
    let format = body.format.as_deref().unwrap_or("json");
    validate_format(rid, format)?;

    let row = campdb_db::create_report(
        &state.pool,
        body.user_id.trim(),
        &body.report_type,
        format,
        &body.parameters.unwrap_or_else(|| serde_json::json!({})),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    campdb_db::enqueue_job(
        &state.pool,
        REPORTS_QUEUE,
        GENERATE_REPORT_JOB,
        &serde_json::json!({ "report_id": row.id }),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(report = %row.public_id, report_type = %row.report_type, "report queued");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ReportItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/reports
pub(super) async fn list_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ApiResponse<Vec<ReportItem>>>, ApiError> {
    let rows = campdb_db::list_reports(
        &state.pool,
        query.user_id.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ReportItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/reports/{id}
pub(super) async fn get_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportItem>>, ApiError> {
    let row = campdb_db::get_report(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", "report not found"))?;

    Ok(Json(ApiResponse {
        data: ReportItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

// ---------------------------------------------------------------------------
// report_schedules handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/report-schedules
pub(super) async fn create_report_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateReportScheduleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportScheduleItem>>), ApiError> {
    let rid = &req_id.0;

    if body.user_id.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "user_id is required"));
    }
    validate_report_type(rid, &body.report_type)?;
    let format = body.format.as_deref().unwrap_or("json");
    validate_format(rid, format)?;
    validate_frequency(rid, &body.frequency)?;

    let row = campdb_db::create_report_schedule(
        &state.pool,
        body.user_id.trim(),
        &body.report_type,
        format,
        &body.frequency,
        &body.recipients,
        &body.parameters.unwrap_or_else(|| serde_json::json!({})),
        next_run_after(&body.frequency, Utc::now()),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ReportScheduleItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/report-schedules
pub(super) async fn list_report_schedules(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScheduleListQuery>,
) -> Result<Json<ApiResponse<Vec<ReportScheduleItem>>>, ApiError> {
    let rows = campdb_db::list_report_schedules(&state.pool, query.user_id.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ReportScheduleItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/report-schedules/{id}
pub(super) async fn update_report_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateReportScheduleRequest>,
) -> Result<Json<ApiResponse<ReportScheduleItem>>, ApiError> {
    let rid = &req_id.0;

    let existing = campdb_db::get_report_schedule(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "report schedule not found"))?;

    if let Some(format) = &body.format {
        validate_format(rid, format)?;
    }
    // A frequency change reschedules the next run from now.
    let next_run_at = match &body.frequency {
        Some(frequency) => {
            validate_frequency(rid, frequency)?;
            Some(next_run_after(frequency, Utc::now()))
        }
        None => None,
    };

    let row = campdb_db::update_report_schedule(
        &state.pool,
        existing.id,
        body.format.as_deref(),
        body.frequency.as_deref(),
        body.recipients.as_deref(),
        body.parameters.as_ref(),
        body.is_active,
        next_run_at,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ReportScheduleItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/report-schedules/{id} — disable, keep history.
pub(super) async fn deactivate_report_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;

    let existing = campdb_db::get_report_schedule(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "report schedule not found"))?;

    campdb_db::deactivate_report_schedule(&state.pool, existing.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    #[sqlx::test(migrations = "../../migrations")]
    async fn creating_a_report_enqueues_a_generation_job(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool.clone()),
            "POST",
            "/api/v1/reports",
            Some(serde_json::json!({
                "user_id": "maria",
                "report_type": "campaign_performance"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "queued");
        assert_eq!(json["data"]["format"], "json");

        let stats = campdb_db::queue_stats(&pool, super::REPORTS_QUEUE)
            .await
            .expect("queue stats");
        assert_eq!(stats.pending, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_report_type_is_rejected(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/reports",
            Some(serde_json::json!({ "user_id": "maria", "report_type": "horoscope" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unsupported_format_is_rejected_before_insert(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/reports",
            Some(serde_json::json!({
                "user_id": "maria",
                "report_type": "campaign_performance",
                "format": "pdf"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn schedule_creation_sets_next_run_one_interval_out(pool: sqlx::PgPool) {
        let before = chrono::Utc::now();
        let json = body_json(
            send(
                test_app(pool),
                "POST",
                "/api/v1/report-schedules",
                Some(serde_json::json!({
                    "user_id": "maria",
                    "report_type": "platform_overview",
                    "frequency": "weekly",
                    "recipients": ["maria@example.com"]
                })),
            )
            .await,
        )
        .await;

        let next_run: chrono::DateTime<chrono::Utc> = json["data"]["next_run_at"]
            .as_str()
            .expect("next_run_at")
            .parse()
            .expect("timestamp");
        let days = (next_run - before).num_days();
        assert_eq!(days, 7, "weekly schedule should run seven days out");
        assert_eq!(json["data"]["is_active"], true);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn frequency_change_reschedules_from_now(pool: sqlx::PgPool) {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/report-schedules",
                Some(serde_json::json!({
                    "user_id": "maria",
                    "report_type": "platform_overview",
                    "frequency": "monthly"
                })),
            )
            .await,
        )
        .await;
        let id = created["data"]["id"].as_str().expect("id");

        let updated = body_json(
            send(
                test_app(pool),
                "PATCH",
                &format!("/api/v1/report-schedules/{id}"),
                Some(serde_json::json!({ "frequency": "daily" })),
            )
            .await,
        )
        .await;

        let next_run: chrono::DateTime<chrono::Utc> = updated["data"]["next_run_at"]
            .as_str()
            .expect("next_run_at")
            .parse()
            .expect("timestamp");
        assert!(next_run - chrono::Utc::now() < chrono::Duration::days(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivation_keeps_the_schedule_row(pool: sqlx::PgPool) {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/report-schedules",
                Some(serde_json::json!({
                    "user_id": "maria",
                    "report_type": "brand_summary",
                    "frequency": "daily"
                })),
            )
            .await,
        )
        .await;
        let id = created["data"]["id"].as_str().expect("id");

        let deleted = send(
            test_app(pool.clone()),
            "DELETE",
            &format!("/api/v1/report-schedules/{id}"),
            None,
        )
        .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let listing = body_json(
            send(test_app(pool), "GET", "/api/v1/report-schedules", None).await,
        )
        .await;
        let row = &listing["data"].as_array().expect("data array")[0];
        assert_eq!(row["is_active"], false);
    }
}
