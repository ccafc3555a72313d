//! Database operations for `content` and its `content_metrics` time series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `content` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentRow {
    pub id: i64,
    pub public_id: Uuid,
    pub campaign_id: i64,
    pub influencer_id: Option<i64>,
    pub schedule_id: Option<i64>,
    pub title: String,
    pub platform: String,
    pub content_type: String,
    pub url: Option<String>,
    pub status: String,
    pub platform_metrics: serde_json::Value,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A row from the `content_metrics` time series.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentMetricRow {
    pub id: i64,
    pub content_id: i64,
    pub captured_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub completion_rate: Option<Decimal>,
    pub extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

const CONTENT_COLUMNS: &str = "id, public_id, campaign_id, influencer_id, schedule_id, title, \
     platform, content_type, url, status, platform_metrics, published_at, \
     created_at, updated_at, deleted_at";

/// Lists non-deleted content, newest first, with optional filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content(
    pool: &PgPool,
    campaign_id: Option<i64>,
    platform: Option<&str>,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<ContentRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentRow>(&format!(
        "SELECT {CONTENT_COLUMNS} \
         FROM content \
         WHERE deleted_at IS NULL \
           AND ($1::BIGINT IS NULL OR campaign_id = $1) \
           AND ($2::TEXT IS NULL OR platform = $2) \
           AND ($3::TEXT IS NULL OR status = $3) \
         ORDER BY created_at DESC \
         LIMIT $4"
    ))
    .bind(campaign_id)
    .bind(platform)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single non-deleted content row by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_content(pool: &PgPool, public_id: Uuid) -> Result<Option<ContentRow>, DbError> {
    let row = sqlx::query_as::<_, ContentRow>(&format!(
        "SELECT {CONTENT_COLUMNS} \
         FROM content \
         WHERE public_id = $1 AND deleted_at IS NULL"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a content row and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // public API for full content creation; no sensible grouping
pub async fn create_content(
    pool: &PgPool,
    campaign_id: i64,
    influencer_id: Option<i64>,
    schedule_id: Option<i64>,
    title: &str,
    platform: &str,
    content_type: &str,
    url: Option<&str>,
    platform_metrics: &serde_json::Value,
    published_at: Option<DateTime<Utc>>,
) -> Result<ContentRow, DbError> {
    let status = if published_at.is_some() {
        "published"
    } else {
        "draft"
    };

    let row = sqlx::query_as::<_, ContentRow>(&format!(
        "INSERT INTO content \
           (campaign_id, influencer_id, schedule_id, title, platform, content_type, url, \
            status, platform_metrics, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {CONTENT_COLUMNS}"
    ))
    .bind(campaign_id)
    .bind(influencer_id)
    .bind(schedule_id)
    .bind(title)
    .bind(platform)
    .bind(content_type)
    .bind(url)
    .bind(status)
    .bind(platform_metrics)
    .bind(published_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Sparse update of a content row; `None` preserves the existing value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // mirrors the row's updatable fields
pub async fn update_content(
    pool: &PgPool,
    content_id: i64,
    title: Option<&str>,
    url: Option<&str>,
    status: Option<&str>,
    platform_metrics: Option<&serde_json::Value>,
    published_at: Option<DateTime<Utc>>,
) -> Result<ContentRow, DbError> {
    let row = sqlx::query_as::<_, ContentRow>(&format!(
        "UPDATE content \
         SET title            = COALESCE($2, title), \
             url              = COALESCE($3, url), \
             status           = COALESCE($4, status), \
             platform_metrics = COALESCE($5, platform_metrics), \
             published_at     = COALESCE($6, published_at), \
             updated_at       = NOW() \
         WHERE id = $1 \
         RETURNING {CONTENT_COLUMNS}"
    ))
    .bind(content_id)
    .bind(title)
    .bind(url)
    .bind(status)
    .bind(platform_metrics)
    .bind(published_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Soft-deletes a content row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn deactivate_content(pool: &PgPool, content_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE content \
         SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(content_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Appends one snapshot to a content's metric time series.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // one argument per measured field
pub async fn append_content_metric(
    pool: &PgPool,
    content_id: i64,
    captured_at: Option<DateTime<Utc>>,
    views: i64,
    likes: i64,
    comments: i64,
    shares: i64,
    completion_rate: Option<Decimal>,
    extra: &serde_json::Value,
) -> Result<ContentMetricRow, DbError> {
    let row = sqlx::query_as::<_, ContentMetricRow>(
        "INSERT INTO content_metrics \
           (content_id, captured_at, views, likes, comments, shares, completion_rate, extra) \
         VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8) \
         RETURNING id, content_id, captured_at, views, likes, comments, shares, \
                   completion_rate, extra, created_at",
    )
    .bind(content_id)
    .bind(captured_at)
    .bind(views)
    .bind(likes)
    .bind(comments)
    .bind(shares)
    .bind(completion_rate)
    .bind(extra)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Lists a content's metric snapshots, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_metrics(
    pool: &PgPool,
    content_id: i64,
    limit: i64,
) -> Result<Vec<ContentMetricRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentMetricRow>(
        "SELECT id, content_id, captured_at, views, likes, comments, shares, \
                completion_rate, extra, created_at \
         FROM content_metrics \
         WHERE content_id = $1 \
         ORDER BY captured_at DESC \
         LIMIT $2",
    )
    .bind(content_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
