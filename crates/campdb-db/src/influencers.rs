//! Database operations for `influencers` and the `campaign_influencers` roster.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `influencers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InfluencerRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub handle: Option<String>,
    pub platform: Option<String>,
    pub follower_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const INFLUENCER_COLUMNS: &str =
    "id, public_id, name, handle, platform, follower_count, created_at, updated_at, deleted_at";

/// Returns a single non-deleted influencer by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_influencer(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<InfluencerRow>, DbError> {
    let row = sqlx::query_as::<_, InfluencerRow>(&format!(
        "SELECT {INFLUENCER_COLUMNS} \
         FROM influencers \
         WHERE public_id = $1 AND deleted_at IS NULL"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the active influencer roster for a campaign, ordered by name.
///
/// This roster is the universe the schedule importer matches names against.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaign_influencers(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<Vec<InfluencerRow>, DbError> {
    let rows = sqlx::query_as::<_, InfluencerRow>(
        "SELECT i.id, i.public_id, i.name, i.handle, i.platform, i.follower_count, \
                i.created_at, i.updated_at, i.deleted_at \
         FROM influencers i \
         JOIN campaign_influencers ci ON ci.influencer_id = i.id \
         WHERE ci.campaign_id = $1 AND ci.status = 'active' AND i.deleted_at IS NULL \
         ORDER BY i.name",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Adds an influencer to a campaign roster (idempotent on the unique pair).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn attach_campaign_influencer(
    pool: &PgPool,
    campaign_id: i64,
    influencer_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO campaign_influencers (campaign_id, influencer_id) \
         VALUES ($1, $2) \
         ON CONFLICT (campaign_id, influencer_id) DO UPDATE SET status = 'active'",
    )
    .bind(campaign_id)
    .bind(influencer_id)
    .execute(pool)
    .await?;
    Ok(())
}
