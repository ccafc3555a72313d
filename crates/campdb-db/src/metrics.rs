//! Database operations for the generic `metrics` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `metrics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricRow {
    pub id: i64,
    pub public_id: Uuid,
    pub metric_type: String,
    pub campaign_id: Option<i64>,
    pub content_id: Option<i64>,
    pub influencer_id: Option<i64>,
    pub value: Decimal,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Filter for [`list_metrics`]; all fields are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    pub metric_type: Option<String>,
    pub campaign_id: Option<i64>,
    pub content_id: Option<i64>,
    pub influencer_id: Option<i64>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// Lists metrics matching the filter, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_metrics(
    pool: &PgPool,
    filter: &MetricFilter,
    limit: i64,
) -> Result<Vec<MetricRow>, DbError> {
    let rows = sqlx::query_as::<_, MetricRow>(
        "SELECT id, public_id, metric_type, campaign_id, content_id, influencer_id, \
                value, period_start, period_end, metadata, created_at \
         FROM metrics \
         WHERE ($1::TEXT IS NULL OR metric_type = $1) \
           AND ($2::BIGINT IS NULL OR campaign_id = $2) \
           AND ($3::BIGINT IS NULL OR content_id = $3) \
           AND ($4::BIGINT IS NULL OR influencer_id = $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR period_start >= $5) \
           AND ($6::TIMESTAMPTZ IS NULL OR period_end <= $6) \
         ORDER BY created_at DESC \
         LIMIT $7",
    )
    .bind(filter.metric_type.as_deref())
    .bind(filter.campaign_id)
    .bind(filter.content_id)
    .bind(filter.influencer_id)
    .bind(filter.period_start)
    .bind(filter.period_end)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts one metric measurement and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // one argument per measurement dimension
pub async fn insert_metric(
    pool: &PgPool,
    metric_type: &str,
    campaign_id: Option<i64>,
    content_id: Option<i64>,
    influencer_id: Option<i64>,
    value: Decimal,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    metadata: &serde_json::Value,
) -> Result<MetricRow, DbError> {
    let row = sqlx::query_as::<_, MetricRow>(
        "INSERT INTO metrics \
           (metric_type, campaign_id, content_id, influencer_id, value, \
            period_start, period_end, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, public_id, metric_type, campaign_id, content_id, influencer_id, \
                   value, period_start, period_end, metadata, created_at",
    )
    .bind(metric_type)
    .bind(campaign_id)
    .bind(content_id)
    .bind(influencer_id)
    .bind(value)
    .bind(period_start)
    .bind(period_end)
    .bind(metadata)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
