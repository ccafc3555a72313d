//! Brand CRUD and the brand-campaign link endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, map_unique_violation, resolve_brand, resolve_campaign, ApiError, ApiResponse,
    AppState, ResponseMeta,
};

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct BrandItem {
    id: Uuid,
    name: String,
    slug: String,
    industry: Option<String>,
    country: Option<String>,
    size: Option<String>,
    status: String,
    total_campaigns: i32,
    total_influencers: i32,
    total_budget: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::BrandRow> for BrandItem {
    fn from(row: campdb_db::BrandRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            slug: row.slug,
            industry: row.industry,
            country: row.country,
            size: row.size,
            status: row.status,
            total_campaigns: row.total_campaigns,
            total_influencers: row.total_influencers,
            total_budget: row.total_budget,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BrandQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBrandRequest {
    pub name: String,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub size: Option<String>,
    pub status: Option<String>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value" (PATCH semantics).
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateBrandRequest {
    pub name: Option<String>,
    pub status: Option<String>,
    pub industry: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub size: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub(super) struct BrandCampaignItem {
    campaign_id: Uuid,
    campaign_name: String,
    campaign_status: String,
    role: String,
    allocated_budget: Option<Decimal>,
    actual_spend: Option<Decimal>,
    reach_actual: Option<i64>,
    engagement_actual: Option<Decimal>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<campdb_db::BrandCampaignRow> for BrandCampaignItem {
    fn from(row: campdb_db::BrandCampaignRow) -> Self {
        Self {
            campaign_id: row.campaign_public_id,
            campaign_name: row.campaign_name,
            campaign_status: row.campaign_status,
            role: row.role,
            allocated_budget: row.allocated_budget,
            actual_spend: row.actual_spend,
            reach_actual: row.reach_actual,
            engagement_actual: row.engagement_actual,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AttachCampaignRequest {
    pub campaign_id: Uuid,
    pub role: Option<String>,
    pub allocated_budget: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCampaignLinkRequest {
    pub role: Option<String>,
    pub allocated_budget: Option<Decimal>,
    pub actual_spend: Option<Decimal>,
    pub reach_actual: Option<i64>,
    pub engagement_actual: Option<Decimal>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_brand_status(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "active" | "inactive" | "pending" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("status must be 'active', 'inactive', or 'pending', got '{value}'"),
        )),
    }
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

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/brands — list brands, optionally filtered by status.
pub(super) async fn list_brands(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BrandQuery>,
) -> Result<Json<ApiResponse<Vec<BrandItem>>>, ApiError> {
    if let Some(status) = &query.status {
        validate_brand_status(&req_id.0, status)?;
    }

    let rows = campdb_db::list_brands(&state.pool, query.status.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BrandItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/brands — create a brand; the slug is derived from the name.
pub(super) async fn create_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateBrandRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BrandItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    let status = body.status.as_deref().unwrap_or("active");
    validate_brand_status(rid, status)?;

    let slug = campdb_core::slug::slug_from_name(&name);
    if slug.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must contain at least one alphanumeric character",
        ));
    }

    let row = campdb_db::create_brand(
        &state.pool,
        &name,
        &slug,
        body.industry.as_deref(),
        body.country.as_deref(),
        body.size.as_deref(),
        status,
    )
    .await
    .map_err(|e| map_unique_violation(rid, &e, "a brand with that slug already exists"))?;

    tracing::info!(slug = %row.slug, "brand created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BrandItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/brands/{slug}
pub(super) async fn get_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<BrandItem>>, ApiError> {
    let row = resolve_brand(&state.pool, &req_id.0, &slug).await?;

    Ok(Json(ApiResponse {
        data: BrandItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/brands/{slug}
pub(super) async fn update_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Json(body): Json<UpdateBrandRequest>,
) -> Result<Json<ApiResponse<BrandItem>>, ApiError> {
    let rid = &req_id.0;
    let brand = resolve_brand(&state.pool, rid, &slug).await?;

    if let Some(name) = &body.name {
        validate_name(rid, name.trim())?;
    }
    if let Some(status) = &body.status {
        validate_brand_status(rid, status)?;
    }

    let row = campdb_db::update_brand(
        &state.pool,
        brand.id,
        body.name.as_deref().map(str::trim),
        body.status.as_deref(),
        body.industry.as_ref().map(|opt| opt.as_deref()),
        body.country.as_ref().map(|opt| opt.as_deref()),
        body.size.as_ref().map(|opt| opt.as_deref()),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BrandItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/brands/{slug} — soft delete.
pub(super) async fn deactivate_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let brand = resolve_brand(&state.pool, &req_id.0, &slug).await?;

    campdb_db::deactivate_brand(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(slug = %slug, "brand deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/brands/{slug}/campaigns
pub(super) async fn list_brand_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<BrandCampaignItem>>>, ApiError> {
    let brand = resolve_brand(&state.pool, &req_id.0, &slug).await?;

    let rows = campdb_db::list_brand_campaigns(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BrandCampaignItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/brands/{slug}/campaigns — link a campaign to the brand.
pub(super) async fn attach_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Json(body): Json<AttachCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BrandCampaignItem>>), ApiError> {
    let rid = &req_id.0;
    let brand = resolve_brand(&state.pool, rid, &slug).await?;
    let campaign = resolve_campaign(&state.pool, rid, body.campaign_id).await?;

    let row = campdb_db::attach_brand_campaign(
        &state.pool,
        brand.id,
        campaign.id,
        body.role.as_deref().unwrap_or("sponsor"),
        body.allocated_budget,
    )
    .await
    .map_err(|e| map_unique_violation(rid, &e, "campaign is already linked to this brand"))?;

    campdb_db::refresh_brand_counters(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BrandCampaignItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/brands/{slug}/campaigns/{campaign_id}
pub(super) async fn update_campaign_link(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((slug, campaign_id)): Path<(String, Uuid)>,
    Json(body): Json<UpdateCampaignLinkRequest>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let brand = resolve_brand(&state.pool, rid, &slug).await?;
    let campaign = resolve_campaign(&state.pool, rid, campaign_id).await?;

    let updated = campdb_db::update_brand_campaign(
        &state.pool,
        brand.id,
        campaign.id,
        body.role.as_deref(),
        body.allocated_budget,
        body.actual_spend,
        body.reach_actual,
        body.engagement_actual,
        body.status.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    if !updated {
        return Err(ApiError::new(
            rid,
            "not_found",
            "campaign is not linked to this brand",
        ));
    }

    campdb_db::refresh_brand_counters(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/brands/{slug}/campaigns/{campaign_id}
pub(super) async fn detach_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((slug, campaign_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let brand = resolve_brand(&state.pool, rid, &slug).await?;
    let campaign = resolve_campaign(&state.pool, rid, campaign_id).await?;

    let removed = campdb_db::detach_brand_campaign(&state.pool, brand.id, campaign.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if !removed {
        return Err(ApiError::new(
            rid,
            "not_found",
            "campaign is not linked to this brand",
        ));
    }

    campdb_db::refresh_brand_counters(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_brand_slugifies_and_returns_201(pool: sqlx::PgPool) {
        let response = send(
            test_app(pool),
            "POST",
            "/api/v1/brands",
            Some(serde_json::json!({ "name": "Acme Beverages", "industry": "beverage" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["slug"], "acme-beverages");
        assert_eq!(json["data"]["status"], "active");
        assert_eq!(json["data"]["industry"], "beverage");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn duplicate_brand_name_conflicts(pool: sqlx::PgPool) {
        let body = serde_json::json!({ "name": "Acme" });
        let first = send(test_app(pool.clone()), "POST", "/api/v1/brands", Some(body.clone())).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = send(test_app(pool), "POST", "/api/v1/brands", Some(body)).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let json = body_json(second).await;
        assert_eq!(json["error"]["code"], "conflict");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_brand_slug_is_404(pool: sqlx::PgPool) {
        let response = send(test_app(pool), "GET", "/api/v1/brands/no-such-brand", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn update_rejects_unknown_status(pool: sqlx::PgPool) {
        send(
            test_app(pool.clone()),
            "POST",
            "/api/v1/brands",
            Some(serde_json::json!({ "name": "Acme" })),
        )
        .await;

        let response = send(
            test_app(pool),
            "PATCH",
            "/api/v1/brands/acme",
            Some(serde_json::json!({ "status": "dormant" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivated_brand_disappears_from_listing(pool: sqlx::PgPool) {
        send(
            test_app(pool.clone()),
            "POST",
            "/api/v1/brands",
            Some(serde_json::json!({ "name": "Acme" })),
        )
        .await;

        let deleted = send(test_app(pool.clone()), "DELETE", "/api/v1/brands/acme", None).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let listing = send(test_app(pool), "GET", "/api/v1/brands", None).await;
        let json = body_json(listing).await;
        assert!(json["data"].as_array().expect("data array").is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn attach_campaign_links_and_refreshes_counters(pool: sqlx::PgPool) {
        send(
            test_app(pool.clone()),
            "POST",
            "/api/v1/brands",
            Some(serde_json::json!({ "name": "Acme" })),
        )
        .await;
        let campaign = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/campaigns",
                Some(serde_json::json!({ "name": "Summer Launch" })),
            )
            .await,
        )
        .await;
        let campaign_id = campaign["data"]["id"].as_str().expect("campaign id");

        let linked = send(
            test_app(pool.clone()),
            "POST",
            "/api/v1/brands/acme/campaigns",
            Some(serde_json::json!({ "campaign_id": campaign_id, "allocated_budget": "1500.00" })),
        )
        .await;
        assert_eq!(linked.status(), StatusCode::CREATED);
        let json = body_json(linked).await;
        assert_eq!(json["data"]["role"], "sponsor");

        let brand = body_json(send(test_app(pool), "GET", "/api/v1/brands/acme", None).await).await;
        assert_eq!(brand["data"]["total_campaigns"], 1);
    }
}
