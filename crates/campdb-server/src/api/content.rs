//! Content CRUD, metric snapshots, and the YouTube stats sync.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campdb_youtube::YoutubeError;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, resolve_campaign, ApiError, ApiResponse, AppState, ResponseMeta,
};

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ContentItem {
    id: Uuid,
    title: String,
    platform: String,
    content_type: String,
    url: Option<String>,
    status: String,
    platform_metrics: serde_json::Value,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::ContentRow> for ContentItem {
    fn from(row: campdb_db::ContentRow) -> Self {
        Self {
            id: row.public_id,
            title: row.title,
            platform: row.platform,
            content_type: row.content_type,
            url: row.url,
            status: row.status,
            platform_metrics: row.platform_metrics,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ContentMetricItem {
    captured_at: DateTime<Utc>,
    views: i64,
    likes: i64,
    comments: i64,
    shares: i64,
    completion_rate: Option<Decimal>,
    extra: serde_json::Value,
}

impl From<campdb_db::ContentMetricRow> for ContentMetricItem {
    fn from(row: campdb_db::ContentMetricRow) -> Self {
        Self {
            captured_at: row.captured_at,
            views: row.views,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
            completion_rate: row.completion_rate,
            extra: row.extra,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentQuery {
    pub campaign_id: Option<Uuid>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateContentRequest {
    pub campaign_id: Uuid,
    pub influencer_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
    pub title: String,
    pub platform: String,
    pub content_type: String,
    pub url: Option<String>,
    pub platform_metrics: Option<serde_json::Value>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateContentRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub platform_metrics: Option<serde_json::Value>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AppendMetricRequest {
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    pub completion_rate: Option<Decimal>,
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    pub limit: Option<i64>,
}

fn validate_content_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "draft" | "published" | "archived" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("status must be 'draft', 'published', or 'archived', got '{value}'"),
        )),
    }
}

async fn resolve_content(
    state: &AppState,
    rid: &str,
    public_id: Uuid,
) -> Result<campdb_db::ContentRow, ApiError> {
    campdb_db::get_content(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "content not found"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/content
pub(super) async fn list_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<ApiResponse<Vec<ContentItem>>>, ApiError> {
    let rid = &req_id.0;
    if let Some(status) = &query.status {
        validate_content_status(rid, status)?;
    }

    // The filter takes the campaign's public id; resolve to the internal key.
    let campaign_id = match query.campaign_id {
        Some(public_id) => Some(resolve_campaign(&state.pool, rid, public_id).await?.id),
        None => None,
    };

    let rows = campdb_db::list_content(
        &state.pool,
        campaign_id,
        query.platform.as_deref(),
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContentItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/content
pub(super) async fn create_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContentItem>>), ApiError> {
    let rid = &req_id.0;
    let campaign = resolve_campaign(&state.pool, rid, body.campaign_id).await?;

    let title = body.title.trim().to_owned();
    if title.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "title is required"));
    }

    let Some(platform) = campdb_core::Platform::parse(&body.platform) else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!(
                "platform '{}' is not one of instagram, youtube, tiktok, twitter, facebook",
                body.platform
            ),
        ));
    };
    let content_type = body.content_type.trim().to_lowercase();
    if !platform.accepts_content_type(&content_type) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!(
                "content type '{}' is not valid for platform '{platform}' (allowed: {})",
                body.content_type,
                platform.allowed_content_types().join(", ")
            ),
        ));
    }

    let influencer_id = match body.influencer_id {
        Some(public_id) => Some(
            campdb_db::get_influencer(&state.pool, public_id)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?
                .ok_or_else(|| ApiError::new(rid, "not_found", "influencer not found"))?
                .id,
        ),
        None => None,
    };
    let schedule_id = match body.schedule_id {
        Some(public_id) => Some(
            campdb_db::get_schedule(&state.pool, public_id)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?
                .ok_or_else(|| ApiError::new(rid, "not_found", "schedule not found"))?
                .id,
        ),
        None => None,
    };

    let row = campdb_db::create_content(
        &state.pool,
        campaign.id,
        influencer_id,
        schedule_id,
        &title,
        &platform.to_string(),
        &content_type,
        body.url.as_deref(),
        &body
            .platform_metrics
            .unwrap_or_else(|| serde_json::json!({})),
        body.published_at,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ContentItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/content/{id}
pub(super) async fn get_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ContentItem>>, ApiError> {
    let row = resolve_content(&state, &req_id.0, id).await?;

    Ok(Json(ApiResponse {
        data: ContentItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/content/{id}
pub(super) async fn update_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateContentRequest>,
) -> Result<Json<ApiResponse<ContentItem>>, ApiError> {
    let rid = &req_id.0;
    let existing = resolve_content(&state, rid, id).await?;

    if let Some(status) = &body.status {
        validate_content_status(rid, status)?;
    }

    let row = campdb_db::update_content(
        &state.pool,
        existing.id,
        body.title.as_deref().map(str::trim),
        body.url.as_deref(),
        body.status.as_deref(),
        body.platform_metrics.as_ref(),
        body.published_at,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ContentItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/content/{id} — soft delete.
pub(super) async fn deactivate_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = resolve_content(&state, &req_id.0, id).await?;

    campdb_db::deactivate_content(&state.pool, existing.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/content/{id}/metrics
pub(super) async fn list_content_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<ApiResponse<Vec<ContentMetricItem>>>, ApiError> {
    let content = resolve_content(&state, &req_id.0, id).await?;

    let rows =
        campdb_db::list_content_metrics(&state.pool, content.id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContentMetricItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/content/{id}/metrics — append a snapshot.
pub(super) async fn append_content_metric(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AppendMetricRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContentMetricItem>>), ApiError> {
    let rid = &req_id.0;
    let content = resolve_content(&state, rid, id).await?;

    if body.views < 0 || body.likes < 0 || body.comments < 0 || body.shares < 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "metric counters must not be negative",
        ));
    }

    let row = campdb_db::append_content_metric(
        &state.pool,
        content.id,
        body.captured_at,
        body.views,
        body.likes,
        body.comments,
        body.shares,
        body.completion_rate,
        &body.extra.unwrap_or_else(|| serde_json::json!({})),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ContentMetricItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/content/{id}/sync-youtube — fetch live video stats and append
/// them as a metric snapshot.
///
/// Responds 422 when the content has no recognizable video URL and 503 when
/// no API key is configured.
pub(super) async fn sync_youtube(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<ContentMetricItem>>), ApiError> {
    let rid = &req_id.0;
    let content = resolve_content(&state, rid, id).await?;

    let Some(client) = &state.youtube else {
        return Err(ApiError::new(
            rid,
            "service_unavailable",
            "YouTube integration is not configured (missing API key)",
        ));
    };

    if content.platform != "youtube" {
        return Err(ApiError::new(
            rid,
            "unprocessable",
            format!("content platform is '{}', not 'youtube'", content.platform),
        ));
    }

    let video_id = content
        .url
        .as_deref()
        .and_then(campdb_youtube::extract_video_id)
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "unprocessable",
                "content URL does not contain a recognizable YouTube video id",
            )
        })?;

    let stats = client
        .get_video(&video_id)
        .await
        .map_err(|e| map_youtube_error(rid, &e))?;

    let row = campdb_db::append_content_metric(
        &state.pool,
        content.id,
        None,
        clamp_count(stats.views),
        clamp_count(stats.likes),
        clamp_count(stats.comments),
        0,
        None,
        &serde_json::json!({
            "source": "youtube",
            "video_id": stats.video_id,
            "duration": stats.duration,
        }),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(content = %id, video = %video_id, "youtube stats synced");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ContentMetricItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

fn clamp_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(super) fn map_youtube_error(rid: &str, error: &YoutubeError) -> ApiError {
    match error {
        YoutubeError::NotFound(id) => {
            ApiError::new(rid, "not_found", format!("YouTube resource '{id}' not found"))
        }
        YoutubeError::QuotaExceeded(msg) => {
            tracing::warn!(message = %msg, "YouTube quota exhausted");
            ApiError::new(rid, "service_unavailable", "YouTube API quota exceeded")
        }
        YoutubeError::ApiError { code, message } if *code < 500 => ApiError::new(
            rid,
            "bad_request",
            format!("YouTube API rejected the request: {message}"),
        ),
        other => {
            tracing::error!(error = %other, "YouTube request failed");
            ApiError::new(rid, "bad_gateway", "YouTube API request failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    async fn seed_content(pool: &sqlx::PgPool, url: Option<&str>) -> String {
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
        let campaign_id = campaign["data"]["id"].as_str().expect("campaign id");

        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/content",
                Some(serde_json::json!({
                    "campaign_id": campaign_id,
                    "title": "Launch video",
                    "platform": "youtube",
                    "content_type": "video",
                    "url": url,
                })),
            )
            .await,
        )
        .await;
        created["data"]["id"].as_str().expect("content id").to_owned()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn content_without_published_at_starts_as_draft(pool: sqlx::PgPool) {
        let id = seed_content(&pool, None).await;
        let json = body_json(
            send(test_app(pool), "GET", &format!("/api/v1/content/{id}"), None).await,
        )
        .await;
        assert_eq!(json["data"]["status"], "draft");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn invalid_platform_pair_is_rejected(pool: sqlx::PgPool) {
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
        let campaign_id = campaign["data"]["id"].as_str().expect("campaign id");

        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/content",
            Some(serde_json::json!({
                "campaign_id": campaign_id,
                "title": "Bad pair",
                "platform": "youtube",
                "content_type": "story"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn negative_metric_counters_are_rejected(pool: sqlx::PgPool) {
        let id = seed_content(&pool, None).await;

        let response = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/content/{id}/metrics"),
            Some(serde_json::json!({ "views": -5 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn metric_snapshots_accumulate(pool: sqlx::PgPool) {
        let id = seed_content(&pool, None).await;

        for views in [100, 250] {
            let response = send(
                test_app(pool.clone()),
                "POST",
                &format!("/api/v1/content/{id}/metrics"),
                Some(serde_json::json!({ "views": views, "likes": 10 })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let json = body_json(
            send(
                test_app(pool),
                "GET",
                &format!("/api/v1/content/{id}/metrics"),
                None,
            )
            .await,
        )
        .await;
        assert_eq!(json["data"].as_array().expect("data array").len(), 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_without_api_key_is_503(pool: sqlx::PgPool) {
        let id = seed_content(&pool, Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")).await;

        let response = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/content/{id}/sync-youtube"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "service_unavailable");
    }
}
