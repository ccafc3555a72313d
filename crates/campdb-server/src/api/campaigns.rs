//! Campaign CRUD and the campaign influencer roster.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, resolve_campaign, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(super) struct CampaignItem {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    budget: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::CampaignRow> for CampaignItem {
    fn from(row: campdb_db::CampaignRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            description: row.description,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            budget: row.budget,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct InfluencerItem {
    id: Uuid,
    name: String,
    handle: Option<String>,
    platform: Option<String>,
    follower_count: Option<i64>,
}

impl From<campdb_db::InfluencerRow> for InfluencerItem {
    fn from(row: campdb_db::InfluencerRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            handle: row.handle,
            platform: row.platform,
            follower_count: row.follower_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CampaignQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AttachInfluencerRequest {
    pub influencer_id: Uuid,
}

fn validate_name(req_id: &str, name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "name must be 1-200 characters",
        ));
    }
    Ok(())
}

fn validate_campaign_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "draft" | "active" | "paused" | "completed" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("status must be one of draft, active, paused, completed; got '{value}'"),
        )),
    }
}

fn validate_date_range(
    req_id: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                "end_date must not be before start_date",
            ));
        }
    }
    Ok(())
}

/// GET /api/v1/campaigns
pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CampaignQuery>,
) -> Result<Json<ApiResponse<Vec<CampaignItem>>>, ApiError> {
    if let Some(status) = &query.status {
        validate_campaign_status(&req_id.0, status)?;
    }

    let rows = campdb_db::list_campaigns(
        &state.pool,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(CampaignItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/campaigns — campaigns start in `draft`.
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    validate_date_range(rid, body.start_date, body.end_date)?;

    let row = campdb_db::create_campaign(
        &state.pool,
        &name,
        body.description.as_deref(),
        body.start_date,
        body.end_date,
        body.budget,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(campaign = %row.public_id, "campaign created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CampaignItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/campaigns/{id}
pub(super) async fn get_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CampaignItem>>, ApiError> {
    let row = resolve_campaign(&state.pool, &req_id.0, id).await?;

    Ok(Json(ApiResponse {
        data: CampaignItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/campaigns/{id}
pub(super) async fn update_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<CampaignItem>>, ApiError> {
    let rid = &req_id.0;
    let campaign = resolve_campaign(&state.pool, rid, id).await?;

    if let Some(name) = &body.name {
        validate_name(rid, name.trim())?;
    }
    if let Some(status) = &body.status {
        validate_campaign_status(rid, status)?;
    }
    validate_date_range(
        rid,
        body.start_date.or(campaign.start_date),
        body.end_date.or(campaign.end_date),
    )?;

    let row = campdb_db::update_campaign(
        &state.pool,
        campaign.id,
        body.name.as_deref().map(str::trim),
        body.description.as_deref(),
        body.status.as_deref(),
        body.start_date,
        body.end_date,
        body.budget,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CampaignItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/campaigns/{id} — soft delete.
pub(super) async fn deactivate_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let campaign = resolve_campaign(&state.pool, &req_id.0, id).await?;

    campdb_db::deactivate_campaign(&state.pool, campaign.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(campaign = %id, "campaign deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/campaigns/{id}/influencers — the active roster.
pub(super) async fn list_influencers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<InfluencerItem>>>, ApiError> {
    let campaign = resolve_campaign(&state.pool, &req_id.0, id).await?;

    let rows = campdb_db::list_campaign_influencers(&state.pool, campaign.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(InfluencerItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/campaigns/{id}/influencers — add to the roster (idempotent).
pub(super) async fn attach_influencer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AttachInfluencerRequest>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let campaign = resolve_campaign(&state.pool, rid, id).await?;

    let influencer = campdb_db::get_influencer(&state.pool, body.influencer_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "influencer not found"))?;

    campdb_db::attach_campaign_influencer(&state.pool, campaign.id, influencer.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    #[sqlx::test(migrations = "../../migrations")]
    async fn new_campaigns_start_as_drafts(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/campaigns",
            Some(serde_json::json!({
                "name": "Summer Launch",
                "start_date": "2026-06-01",
                "end_date": "2026-08-31",
                "budget": "50000.00"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "draft");
        assert!(json["data"]["id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn inverted_date_range_is_rejected(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/campaigns",
            Some(serde_json::json!({
                "name": "Backwards",
                "start_date": "2026-08-31",
                "end_date": "2026-06-01"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_checks_range_against_existing_dates(pool: sqlx::PgPool) {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/campaigns",
                Some(serde_json::json!({ "name": "Summer", "start_date": "2026-06-01" })),
            )
            .await,
        )
        .await;
        let id = created["data"]["id"].as_str().expect("id");

        // end_date earlier than the stored start_date
        let response = send(
            test_app(pool),
            "PATCH",
            &format!("/api/v1/campaigns/{id}"),
            Some(serde_json::json!({ "end_date": "2026-01-01" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_cannot_blank_the_name(pool: sqlx::PgPool) {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/campaigns",
                Some(serde_json::json!({ "name": "Summer" })),
            )
            .await,
        )
        .await;
        let id = created["data"]["id"].as_str().expect("id");

        let response = send(
            test_app(pool.clone()),
            "PATCH",
            &format!("/api/v1/campaigns/{id}"),
            Some(serde_json::json!({ "name": "   " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");

        let fetched = body_json(
            send(test_app(pool), "GET", &format!("/api/v1/campaigns/{id}"), None).await,
        )
        .await;
        assert_eq!(fetched["data"]["name"], "Summer");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn attaching_unknown_influencer_is_404(pool: sqlx::PgPool) {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/campaigns",
                Some(serde_json::json!({ "name": "Summer" })),
            )
            .await,
        )
        .await;
        let id = created["data"]["id"].as_str().expect("id");

        let response = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/campaigns/{id}/influencers"),
            Some(serde_json::json!({
                "influencer_id": "00000000-0000-0000-0000-000000000000"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
