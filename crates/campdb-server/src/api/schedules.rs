//! Campaign schedule endpoints, including the Excel bulk import.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campdb_import::{ImportError, ImportSummary, InfluencerRef, ParsedScheduleRow};

use crate::middleware::RequestId;

use super::{map_db_error, resolve_campaign, ApiError, ApiResponse, AppState, ResponseMeta};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ScheduleItem {
    id: Uuid,
    title: String,
    description: Option<String>,
    platform: String,
    content_type: String,
    scheduled_date: NaiveDate,
    objectives: serde_json::Value,
    metrics: serde_json::Value,
    budget: Option<Decimal>,
    actual_cost: Option<Decimal>,
    content_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::ScheduleRow> for ScheduleItem {
    fn from(row: campdb_db::ScheduleRow) -> Self {
        Self {
            id: row.public_id,
            title: row.title,
            description: row.description,
            platform: row.platform,
            content_type: row.content_type,
            scheduled_date: row.scheduled_date,
            objectives: row.objectives,
            metrics: row.metrics,
            budget: row.budget,
            actual_cost: row.actual_cost,
            content_url: row.content_url,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateScheduleRequest {
    pub influencer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub platform: String,
    pub content_type: String,
    pub scheduled_date: NaiveDate,
    pub objectives: Option<serde_json::Value>,
    pub budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateScheduleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub objectives: Option<serde_json::Value>,
    pub metrics: Option<serde_json::Value>,
    pub budget: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub content_url: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImportQuery {
    #[serde(default)]
    pub commit: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportReport {
    rows: Vec<ParsedScheduleRow>,
    summary: ImportSummary,
    /// Present only when `?commit=true`: how many valid rows were inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    inserted: Option<usize>,
}

fn validate_schedule_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "planned" | "published" | "cancelled" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("status must be 'planned', 'published', or 'cancelled', got '{value}'"),
        )),
    }
}

fn validate_platform_pair(
    req_id: &str,
    platform: &str,
    content_type: &str,
) -> Result<(campdb_core::Platform, String), ApiError> {
    let Some(parsed) = campdb_core::Platform::parse(platform) else {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "platform '{platform}' is not one of instagram, youtube, tiktok, twitter, facebook"
            ),
        ));
    };

    let normalized = content_type.trim().to_lowercase();
    if !parsed.accepts_content_type(&normalized) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "content type '{content_type}' is not valid for platform '{parsed}' (allowed: {})",
                parsed.allowed_content_types().join(", ")
            ),
        ));
    }

    Ok((parsed, normalized))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/campaigns/{id}/schedules
pub(super) async fn list_schedules(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ApiResponse<Vec<ScheduleItem>>>, ApiError> {
    let campaign = resolve_campaign(&state.pool, &req_id.0, id).await?;
    if let Some(status) = &query.status {
        validate_schedule_status(&req_id.0, status)?;
    }

    let rows = campdb_db::list_schedules(&state.pool, campaign.id, query.status.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ScheduleItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/campaigns/{id}/schedules — create one schedule entry.
pub(super) async fn create_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ScheduleItem>>), ApiError> {
    let rid = &req_id.0;
    let campaign = resolve_campaign(&state.pool, rid, id).await?;

    let title = body.title.trim().to_owned();
    if title.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "title is required"));
    }
    let (platform, content_type) = validate_platform_pair(rid, &body.platform, &body.content_type)?;

    let influencer = campdb_db::get_influencer(&state.pool, body.influencer_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "influencer not found"))?;

    let new = campdb_db::NewSchedule {
        campaign_id: campaign.id,
        influencer_id: influencer.id,
        title,
        description: body.description,
        platform: platform.to_string(),
        content_type,
        scheduled_date: body.scheduled_date,
        objectives: body.objectives.unwrap_or_else(|| serde_json::json!([])),
        budget: body.budget,
    };

    let row = campdb_db::create_schedule(&state.pool, &new)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ScheduleItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/campaigns/{id}/schedules/import — parse an uploaded workbook
/// into a per-row validation report; `?commit=true` also inserts valid rows.
pub(super) async fn import_schedules(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Query(query): Query<ImportQuery>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let rid = &req_id.0;
    let campaign = resolve_campaign(&state.pool, rid, id).await?;

    let bytes = read_workbook_field(rid, multipart, state.import_max_bytes).await?;

    let roster: Vec<InfluencerRef> = campdb_db::list_campaign_influencers(&state.pool, campaign.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .into_iter()
        .map(|i| InfluencerRef {
            id: i.id,
            name: i.name,
        })
        .collect();

    let rows = campdb_import::parse_schedule_workbook(&bytes, &roster).map_err(|e| match e {
        ImportError::NoWorksheets => {
            ApiError::new(rid, "validation_error", "workbook has no worksheets")
        }
        ImportError::Workbook(source) => {
            tracing::warn!(error = %source, "uploaded file is not a readable workbook");
            ApiError::new(
                rid,
                "validation_error",
                "file could not be read as an Excel workbook",
            )
        }
    })?;

    let summary = campdb_import::summarize(&rows);

    let inserted = if query.commit {
        let drafts: Vec<campdb_db::NewSchedule> = rows
            .iter()
            .filter(|r| r.is_valid)
            .map(|r| draft_to_new_schedule(campaign.id, r))
            .collect();
        let count = campdb_db::insert_schedule_drafts(&state.pool, &drafts)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        tracing::info!(
            campaign = %id,
            inserted = count,
            invalid = summary.invalid,
            "schedule import committed"
        );
        Some(count)
    } else {
        None
    };

    Ok(Json(ApiResponse {
        data: ImportReport {
            rows,
            summary,
            inserted,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Converts a fully-valid parsed row into an insertable schedule.
///
/// Only called on rows with `is_valid == true`, where every required draft
/// field is `Some`.
fn draft_to_new_schedule(campaign_id: i64, row: &ParsedScheduleRow) -> campdb_db::NewSchedule {
    let draft = &row.draft;
    campdb_db::NewSchedule {
        campaign_id,
        influencer_id: draft.influencer_id.unwrap_or_default(),
        title: draft.title.clone().unwrap_or_default(),
        description: draft.description.clone(),
        platform: draft
            .platform
            .map(|p| p.to_string())
            .unwrap_or_default(),
        content_type: draft.content_type.clone().unwrap_or_default(),
        scheduled_date: draft.scheduled_date.unwrap_or_default(),
        objectives: serde_json::json!([]),
        budget: None,
    }
}

/// Pulls the `file` part out of the multipart body, enforcing the MIME
/// allow-list and the configured size cap.
async fn read_workbook_field(
    rid: &str,
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "failed to read multipart body");
        ApiError::new(rid, "bad_request", "malformed multipart body")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let looks_like_excel = field
            .content_type()
            .is_some_and(|ct| ct == XLSX_MIME || ct == XLS_MIME)
            || field
                .file_name()
                .is_some_and(|n| n.ends_with(".xlsx") || n.ends_with(".xls"));
        if !looks_like_excel {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "file must be an .xls or .xlsx workbook",
            ));
        }

        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to buffer uploaded file");
            ApiError::new(rid, "bad_request", "failed to read uploaded file")
        })?;

        if bytes.len() > max_bytes {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("file exceeds the {max_bytes}-byte upload limit"),
            ));
        }

        return Ok(bytes.to_vec());
    }

    Err(ApiError::new(
        rid,
        "validation_error",
        "multipart body must contain a 'file' field",
    ))
}

/// GET /api/v1/schedules/{id}
pub(super) async fn get_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScheduleItem>>, ApiError> {
    let row = campdb_db::get_schedule(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", "schedule not found"))?;

    Ok(Json(ApiResponse {
        data: ScheduleItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/schedules/{id}
pub(super) async fn update_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateScheduleRequest>,
) -> Result<Json<ApiResponse<ScheduleItem>>, ApiError> {
    let rid = &req_id.0;
    let existing = campdb_db::get_schedule(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "schedule not found"))?;

    if let Some(status) = &body.status {
        validate_schedule_status(rid, status)?;
    }

    let row = campdb_db::update_schedule(
        &state.pool,
        existing.id,
        body.title.as_deref().map(str::trim),
        body.description.as_deref(),
        body.scheduled_date,
        body.objectives.as_ref(),
        body.metrics.as_ref(),
        body.budget,
        body.actual_cost,
        body.content_url.as_deref(),
        body.status.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ScheduleItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/schedules/{id} — soft delete.
pub(super) async fn delete_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = campdb_db::get_schedule(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", "schedule not found"))?;

    campdb_db::delete_schedule(&state.pool, existing.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::tests::{body_json, send, test_app};

    async fn seed_campaign_with_influencer(pool: &sqlx::PgPool) -> (String, String) {
        let campaign = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/campaigns",
                Some(serde_json::json!({ "name": "Summer" })),
            )
            .await,
        )
        .await;
        let campaign_id = campaign["data"]["id"].as_str().expect("campaign id").to_owned();

        let influencer_id: uuid::Uuid = sqlx::query_scalar(
            "INSERT INTO influencers (name, handle, platform, follower_count) \
             VALUES ('Laura Gomez', '@lauragomez', 'instagram', 120000) RETURNING public_id",
        )
        .fetch_one(pool)
        .await
        .expect("insert influencer");

        send(
            test_app(pool.clone()),
            "POST",
            &format!("/api/v1/campaigns/{campaign_id}/influencers"),
            Some(serde_json::json!({ "influencer_id": influencer_id })),
        )
        .await;

        (campaign_id, influencer_id.to_string())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_schedule_returns_201(pool: sqlx::PgPool) {
        let (campaign_id, influencer_id) = seed_campaign_with_influencer(&pool).await;

        let response = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/campaigns/{campaign_id}/schedules"),
            Some(serde_json::json!({
                "title": "Launch reel",
                "influencer_id": influencer_id,
                "platform": "instagram",
                "content_type": "reel",
                "scheduled_date": "2026-06-15"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "planned");
        assert_eq!(json["data"]["platform"], "instagram");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn platform_content_type_mismatch_is_rejected(pool: sqlx::PgPool) {
        let (campaign_id, influencer_id) = seed_campaign_with_influencer(&pool).await;

        let response = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/campaigns/{campaign_id}/schedules"),
            Some(serde_json::json!({
                "title": "Impossible",
                "influencer_id": influencer_id,
                "platform": "youtube",
                "content_type": "story",
                "scheduled_date": "2026-06-15"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    fn multipart_request(uri: &str, filename: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "campdb-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_rejects_non_excel_uploads(pool: sqlx::PgPool) {
        let (campaign_id, _) = seed_campaign_with_influencer(&pool).await;

        let request = multipart_request(
            &format!("/api/v1/campaigns/{campaign_id}/schedules/import"),
            "schedule.txt",
            "text/plain",
            b"not a workbook",
        );
        let response = test_app(pool).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_rejects_unreadable_workbook(pool: sqlx::PgPool) {
        let (campaign_id, _) = seed_campaign_with_influencer(&pool).await;

        // Right extension and MIME, but the bytes are not a spreadsheet.
        let request = multipart_request(
            &format!("/api/v1/campaigns/{campaign_id}/schedules/import"),
            "schedule.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            b"garbage bytes",
        );
        let response = test_app(pool).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_against_unknown_campaign_is_404(pool: sqlx::PgPool) {
        let request = multipart_request(
            "/api/v1/campaigns/00000000-0000-0000-0000-000000000000/schedules/import",
            "schedule.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            b"irrelevant",
        );
        let response = test_app(pool).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
