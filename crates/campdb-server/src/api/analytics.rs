//! Aggregate analytics endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, resolve_campaign, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct OverviewBody {
    active_campaigns: i64,
    active_brands: i64,
    published_content: i64,
    total_reach: i64,
    total_engagement: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignRollupBody {
    campaign_id: Uuid,
    schedules_planned: i64,
    schedules_published: i64,
    schedules_cancelled: i64,
    content_count: i64,
    budget_allocated: Decimal,
    budget_spent: Decimal,
    reach_actual: i64,
    engagement_actual: Decimal,
}

/// GET /api/v1/analytics/overview
pub(super) async fn overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<OverviewBody>>, ApiError> {
    let row = campdb_db::overview(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OverviewBody {
            active_campaigns: row.active_campaigns,
            active_brands: row.active_brands,
            published_content: row.published_content,
            total_reach: row.total_reach,
            total_engagement: row.total_engagement,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/analytics/campaigns/{id}
pub(super) async fn campaign_rollup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CampaignRollupBody>>, ApiError> {
    let campaign = resolve_campaign(&state.pool, &req_id.0, id).await?;

    let row = campdb_db::campaign_rollup(&state.pool, campaign.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CampaignRollupBody {
            campaign_id: campaign.public_id,
            schedules_planned: row.schedules_planned,
            schedules_published: row.schedules_published,
            schedules_cancelled: row.schedules_cancelled,
            content_count: row.content_count,
            budget_allocated: row.budget_allocated,
            budget_spent: row.budget_spent,
            reach_actual: row.reach_actual,
            engagement_actual: row.engagement_actual,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    #[sqlx::test(migrations = "../../migrations")]
    async fn overview_starts_at_zero(pool: sqlx::PgPool) {
        let response = send(test_app(pool), "GET", "/api/v1/analytics/overview", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"]["active_campaigns"], 0);
        assert_eq!(json["data"]["active_brands"], 0);
        assert_eq!(json["data"]["published_content"], 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn campaign_rollup_counts_schedule_states(pool: sqlx::PgPool) {
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
        let id = campaign["data"]["id"].as_str().expect("id");

        let campaign_pk: i64 = sqlx::query_scalar("SELECT id FROM campaigns WHERE public_id = $1")
            .bind(id.parse::<uuid::Uuid>().expect("uuid"))
            .fetch_one(&pool)
            .await
            .expect("campaign pk");
        let influencer_pk: i64 = sqlx::query_scalar(
            "INSERT INTO influencers (name) VALUES ('Laura Gomez') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .expect("influencer pk");
        for status in ["planned", "planned", "published"] {
            sqlx::query(
                "INSERT INTO campaign_schedules \
                   (campaign_id, influencer_id, title, platform, content_type, scheduled_date, status) \
                 VALUES ($1, $2, 'Post', 'instagram', 'post', '2026-06-15', $3)",
            )
            .bind(campaign_pk)
            .bind(influencer_pk)
            .bind(status)
            .execute(&pool)
            .await
            .expect("insert schedule");
        }

        let json = body_json(
            send(
                test_app(pool),
                "GET",
                &format!("/api/v1/analytics/campaigns/{id}"),
                None,
            )
            .await,
        )
        .await;
        assert_eq!(json["data"]["schedules_planned"], 2);
        assert_eq!(json["data"]["schedules_published"], 1);
        assert_eq!(json["data"]["schedules_cancelled"], 0);
    }
}
