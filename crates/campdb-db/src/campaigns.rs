//! Database operations for the `campaigns` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const CAMPAIGN_COLUMNS: &str = "id, public_id, name, description, status, start_date, end_date, \
     budget, created_at, updated_at, deleted_at";

/// Returns non-deleted campaigns, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(
    pool: &PgPool,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} \
         FROM campaigns \
         WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at DESC \
         LIMIT $2"
    ))
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single non-deleted campaign by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign(pool: &PgPool, public_id: Uuid) -> Result<Option<CampaignRow>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} \
         FROM campaigns \
         WHERE public_id = $1 AND deleted_at IS NULL"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a new campaign (status `draft`) and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_campaign(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    budget: Option<Decimal>,
) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (name, description, start_date, end_date, budget) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(name)
    .bind(description)
    .bind(start_date)
    .bind(end_date)
    .bind(budget)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Sparse update of campaign fields; `None` preserves the existing value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_campaign(
    pool: &PgPool,
    campaign_id: i64,
    name: Option<&str>,
    description: Option<&str>,
    status: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    budget: Option<Decimal>,
) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "UPDATE campaigns \
         SET name        = COALESCE($2, name), \
             description = COALESCE($3, description), \
             status      = COALESCE($4, status), \
             start_date  = COALESCE($5, start_date), \
             end_date    = COALESCE($6, end_date), \
             budget      = COALESCE($7, budget), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(campaign_id)
    .bind(name)
    .bind(description)
    .bind(status)
    .bind(start_date)
    .bind(end_date)
    .bind(budget)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Soft-deletes a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn deactivate_campaign(pool: &PgPool, campaign_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE campaigns \
         SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(campaign_id)
    .execute(pool)
    .await?;
    Ok(())
}
