//! Database operations for the `brand_campaigns` join table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A `brand_campaigns` row joined with the campaign's public identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandCampaignRow {
    pub id: i64,
    pub brand_id: i64,
    pub campaign_id: i64,
    pub campaign_public_id: Uuid,
    pub campaign_name: String,
    pub campaign_status: String,
    pub role: String,
    pub allocated_budget: Option<Decimal>,
    pub actual_spend: Option<Decimal>,
    pub reach_actual: Option<i64>,
    pub engagement_actual: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const LINK_SELECT: &str = "SELECT bc.id, bc.brand_id, bc.campaign_id, \
            c.public_id AS campaign_public_id, c.name AS campaign_name, \
            c.status AS campaign_status, \
            bc.role, bc.allocated_budget, bc.actual_spend, bc.reach_actual, \
            bc.engagement_actual, bc.status, bc.created_at, bc.updated_at \
     FROM brand_campaigns bc \
     JOIN campaigns c ON c.id = bc.campaign_id";

/// Lists all campaign links for a brand, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brand_campaigns(
    pool: &PgPool,
    brand_id: i64,
) -> Result<Vec<BrandCampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandCampaignRow>(&format!(
        "{LINK_SELECT} \
         WHERE bc.brand_id = $1 \
         ORDER BY bc.created_at DESC"
    ))
    .bind(brand_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Links a brand to a campaign and returns the joined row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, including a unique violation
/// when the pair is already linked.
pub async fn attach_brand_campaign(
    pool: &PgPool,
    brand_id: i64,
    campaign_id: i64,
    role: &str,
    allocated_budget: Option<Decimal>,
) -> Result<BrandCampaignRow, DbError> {
    let link_id: i64 = sqlx::query_scalar(
        "INSERT INTO brand_campaigns (brand_id, campaign_id, role, allocated_budget) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(brand_id)
    .bind(campaign_id)
    .bind(role)
    .bind(allocated_budget)
    .fetch_one(pool)
    .await?;

    let row = sqlx::query_as::<_, BrandCampaignRow>(&format!("{LINK_SELECT} WHERE bc.id = $1"))
        .bind(link_id)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Sparse update of a brand-campaign link's budget/actuals.
///
/// Returns `false` when no link exists for the pair.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // mirrors the row's updatable fields
pub async fn update_brand_campaign(
    pool: &PgPool,
    brand_id: i64,
    campaign_id: i64,
    role: Option<&str>,
    allocated_budget: Option<Decimal>,
    actual_spend: Option<Decimal>,
    reach_actual: Option<i64>,
    engagement_actual: Option<Decimal>,
    status: Option<&str>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE brand_campaigns \
         SET role              = COALESCE($3, role), \
             allocated_budget  = COALESCE($4, allocated_budget), \
             actual_spend      = COALESCE($5, actual_spend), \
             reach_actual      = COALESCE($6, reach_actual), \
             engagement_actual = COALESCE($7, engagement_actual), \
             status            = COALESCE($8, status), \
             updated_at        = NOW() \
         WHERE brand_id = $1 AND campaign_id = $2",
    )
    .bind(brand_id)
    .bind(campaign_id)
    .bind(role)
    .bind(allocated_budget)
    .bind(actual_spend)
    .bind(reach_actual)
    .bind(engagement_actual)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes a brand-campaign link. Returns `false` when the pair was not linked.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn detach_brand_campaign(
    pool: &PgPool,
    brand_id: i64,
    campaign_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM brand_campaigns WHERE brand_id = $1 AND campaign_id = $2")
        .bind(brand_id)
        .bind(campaign_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
