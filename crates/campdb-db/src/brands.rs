//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub size: Option<String>,
    pub status: String,
    pub total_campaigns: i32,
    pub total_influencers: i32,
    pub total_budget: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const BRAND_COLUMNS: &str = "id, public_id, name, slug, industry, country, size, status, \
     total_campaigns, total_influencers, total_budget, created_at, updated_at, deleted_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns non-deleted brands ordered by name, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(pool: &PgPool, status: Option<&str>) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} \
         FROM brands \
         WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR status = $1) \
         ORDER BY name"
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single non-deleted brand by slug, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_by_slug(pool: &PgPool, slug: &str) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} \
         FROM brands \
         WHERE slug = $1 AND deleted_at IS NULL"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a new brand row and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails (including unique constraint violations).
pub async fn create_brand(
    pool: &PgPool,
    name: &str,
    slug: &str,
    industry: Option<&str>,
    country: Option<&str>,
    size: Option<&str>,
    status: &str,
) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "INSERT INTO brands (name, slug, industry, country, size, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(name)
    .bind(slug)
    .bind(industry)
    .bind(country)
    .bind(size)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Updates core metadata fields for an existing brand.
///
/// All `Option` fields are overlaid onto the existing row: `Some(v)` sets the value,
/// `None` preserves the existing value. Nullable columns use a supplied/value pair
/// so `Some(None)` can explicitly clear them (PATCH semantics). A single
/// `UPDATE … RETURNING` avoids the SELECT + UPDATE race.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // public API for partial brand update; no sensible grouping
pub async fn update_brand(
    pool: &PgPool,
    brand_id: i64,
    name: Option<&str>,
    status: Option<&str>,
    industry: Option<Option<&str>>,
    country: Option<Option<&str>>,
    size: Option<Option<&str>>,
) -> Result<BrandRow, DbError> {
    let industry_supplied = industry.is_some();
    let industry_val = industry.flatten();
    let country_supplied = country.is_some();
    let country_val = country.flatten();
    let size_supplied = size.is_some();
    let size_val = size.flatten();

    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "UPDATE brands \
         SET name       = COALESCE($2, name), \
             status     = COALESCE($3, status), \
             industry   = CASE WHEN $4::BOOL THEN $5 ELSE industry END, \
             country    = CASE WHEN $6::BOOL THEN $7 ELSE country END, \
             size       = CASE WHEN $8::BOOL THEN $9 ELSE size END, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(brand_id)
    .bind(name)
    .bind(status)
    .bind(industry_supplied)
    .bind(industry_val)
    .bind(country_supplied)
    .bind(country_val)
    .bind(size_supplied)
    .bind(size_val)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Soft-deletes a brand by setting `status = 'inactive'` and `deleted_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn deactivate_brand(pool: &PgPool, brand_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE brands \
         SET status = 'inactive', deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(brand_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recomputes the denormalized campaign/influencer/budget counters for a brand
/// from its `brand_campaigns` links.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn refresh_brand_counters(pool: &PgPool, brand_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE brands b \
         SET total_campaigns = agg.campaigns, \
             total_influencers = agg.influencers, \
             total_budget = agg.budget, \
             updated_at = NOW() \
         FROM ( \
             SELECT COUNT(DISTINCT bc.campaign_id) AS campaigns, \
                    COUNT(DISTINCT ci.influencer_id) AS influencers, \
                    COALESCE(SUM(bc.allocated_budget), 0) AS budget \
             FROM brand_campaigns bc \
             LEFT JOIN campaign_influencers ci ON ci.campaign_id = bc.campaign_id \
             WHERE bc.brand_id = $1 \
         ) agg \
         WHERE b.id = $1",
    )
    .bind(brand_id)
    .execute(pool)
    .await?;
    Ok(())
}
