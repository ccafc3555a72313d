//! Aggregate queries behind the analytics endpoints and the report worker.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Platform-wide counters for the analytics dashboard.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct OverviewRow {
    pub active_campaigns: i64,
    pub active_brands: i64,
    pub published_content: i64,
    pub total_reach: i64,
    pub total_engagement: Decimal,
}

/// Per-campaign rollup of schedule progress, content, and budget.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRollupRow {
    pub campaign_id: i64,
    pub schedules_planned: i64,
    pub schedules_published: i64,
    pub schedules_cancelled: i64,
    pub content_count: i64,
    pub budget_allocated: Decimal,
    pub budget_spent: Decimal,
    pub reach_actual: i64,
    pub engagement_actual: Decimal,
}

/// Computes the cross-campaign overview in a single statement.
///
/// Reach and engagement come from the `brand_campaigns` actuals so the numbers
/// agree with what brand managers report, not raw content metrics.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn overview(pool: &PgPool) -> Result<OverviewRow, DbError> {
    let row = sqlx::query_as::<_, OverviewRow>(
        "SELECT \
            (SELECT COUNT(*) FROM campaigns \
             WHERE status = 'active' AND deleted_at IS NULL)        AS active_campaigns, \
            (SELECT COUNT(*) FROM brands \
             WHERE status = 'active' AND deleted_at IS NULL)        AS active_brands, \
            (SELECT COUNT(*) FROM content \
             WHERE status = 'published' AND deleted_at IS NULL)     AS published_content, \
            (SELECT COALESCE(SUM(reach_actual), 0)::BIGINT \
             FROM brand_campaigns)                                  AS total_reach, \
            (SELECT COALESCE(SUM(engagement_actual), 0) \
             FROM brand_campaigns)                                  AS total_engagement",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Computes the rollup for one campaign by internal id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn campaign_rollup(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<CampaignRollupRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRollupRow>(
        "SELECT $1::BIGINT AS campaign_id, \
            (SELECT COUNT(*) FROM campaign_schedules \
             WHERE campaign_id = $1 AND status = 'planned' \
               AND deleted_at IS NULL)                              AS schedules_planned, \
            (SELECT COUNT(*) FROM campaign_schedules \
             WHERE campaign_id = $1 AND status = 'published' \
               AND deleted_at IS NULL)                              AS schedules_published, \
            (SELECT COUNT(*) FROM campaign_schedules \
             WHERE campaign_id = $1 AND status = 'cancelled' \
               AND deleted_at IS NULL)                              AS schedules_cancelled, \
            (SELECT COUNT(*) FROM content \
             WHERE campaign_id = $1 AND deleted_at IS NULL)         AS content_count, \
            (SELECT COALESCE(SUM(allocated_budget), 0) \
             FROM brand_campaigns WHERE campaign_id = $1)           AS budget_allocated, \
            (SELECT COALESCE(SUM(actual_spend), 0) \
             FROM brand_campaigns WHERE campaign_id = $1)           AS budget_spent, \
            (SELECT COALESCE(SUM(reach_actual), 0)::BIGINT \
             FROM brand_campaigns WHERE campaign_id = $1)           AS reach_actual, \
            (SELECT COALESCE(SUM(engagement_actual), 0) \
             FROM brand_campaigns WHERE campaign_id = $1)           AS engagement_actual",
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Rollups for every active campaign; the report worker serializes these into
/// the generated report payload.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn active_campaign_rollups(pool: &PgPool) -> Result<Vec<CampaignRollupRow>, DbError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM campaigns WHERE status = 'active' AND deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let mut rollups = Vec::with_capacity(ids.len());
    for id in ids {
        rollups.push(campaign_rollup(pool, id).await?);
    }
    Ok(rollups)
}
