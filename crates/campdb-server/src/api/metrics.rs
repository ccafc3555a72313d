//! Generic metric listing and ingestion.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campdb_db::MetricFilter;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, resolve_campaign, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(super) struct MetricItem {
    id: Uuid,
    metric_type: String,
    value: Decimal,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<campdb_db::MetricRow> for MetricItem {
    fn from(row: campdb_db::MetricRow) -> Self {
        Self {
            id: row.public_id,
            metric_type: row.metric_type,
            value: row.value,
            period_start: row.period_start,
            period_end: row.period_end,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ListMetricsQuery {
    pub metric_type: Option<String>,
    pub campaign_id: Option<Uuid>,
    pub content_id: Option<Uuid>,
    pub influencer_id: Option<Uuid>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateMetricRequest {
    pub metric_type: String,
    pub campaign_id: Option<Uuid>,
    pub content_id: Option<Uuid>,
    pub influencer_id: Option<Uuid>,
    pub value: Decimal,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

async fn resolve_content_id(
    state: &AppState,
    rid: &str,
    public_id: Option<Uuid>,
) -> Result<Option<i64>, ApiError> {
    match public_id {
        Some(id) => Ok(Some(
            campdb_db::get_content(&state.pool, id)
                .await
                .map_err(|e| map_db_error(rid.to_owned(), &e))?
                .ok_or_else(|| ApiError::new(rid, "not_found", "content not found"))?
                .id,
        )),
        None => Ok(None),
    }
}

async fn resolve_influencer_id(
    state: &AppState,
    rid: &str,
    public_id: Option<Uuid>,
) -> Result<Option<i64>, ApiError> {
    match public_id {
        Some(id) => Ok(Some(
            campdb_db::get_influencer(&state.pool, id)
                .await
                .map_err(|e| map_db_error(rid.to_owned(), &e))?
                .ok_or_else(|| ApiError::new(rid, "not_found", "influencer not found"))?
                .id,
        )),
        None => Ok(None),
    }
}

/// GET /api/v1/metrics
pub(super) async fn list_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListMetricsQuery>,
) -> Result<Json<ApiResponse<Vec<MetricItem>>>, ApiError> {
    let rid = &req_id.0;

    let campaign_id = match query.campaign_id {
        Some(public_id) => Some(resolve_campaign(&state.pool, rid, public_id).await?.id),
        None => None,
    };
    let filter = MetricFilter {
        metric_type: query.metric_type,
        campaign_id,
        content_id: resolve_content_id(&state, rid, query.content_id).await?,
        influencer_id: resolve_influencer_id(&state, rid, query.influencer_id).await?,
        period_start: query.period_start,
        period_end: query.period_end,
    };

    let rows = campdb_db::list_metrics(&state.pool, &filter, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(MetricItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/metrics
pub(super) async fn create_metric(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateMetricRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MetricItem>>), ApiError> {
    let rid = &req_id.0;

    let metric_type = body.metric_type.trim().to_owned();
    if metric_type.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "metric_type is required"));
    }
    if let (Some(start), Some(end)) = (body.period_start, body.period_end) {
        if end < start {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "period_end must not precede period_start",
            ));
        }
    }

    let campaign_id = match body.campaign_id {
        Some(public_id) => Some(resolve_campaign(&state.pool, rid, public_id).await?.id),
        None => None,
    };
    let content_id = resolve_content_id(&state, rid, body.content_id).await?;
    let influencer_id = resolve_influencer_id(&state, rid, body.influencer_id).await?;

    let row = campdb_db::insert_metric(
        &state.pool,
        &metric_type,
        campaign_id,
        content_id,
        influencer_id,
        body.value,
        body.period_start,
        body.period_end,
        &body.metadata.unwrap_or_else(|| serde_json::json!({})),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: MetricItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
