//! Database operations for the `campaign_schedules` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `campaign_schedules` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub public_id: Uuid,
    pub campaign_id: i64,
    pub influencer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub platform: String,
    pub content_type: String,
    pub scheduled_date: NaiveDate,
    pub objectives: serde_json::Value,
    pub metrics: serde_json::Value,
    pub budget: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub content_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const SCHEDULE_COLUMNS: &str = "id, public_id, campaign_id, influencer_id, title, description, \
     platform, content_type, scheduled_date, objectives, metrics, budget, actual_cost, \
     content_url, status, created_at, updated_at, deleted_at";

/// Fields for a new schedule row; shared by the single-create endpoint and the
/// bulk importer's commit step.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub campaign_id: i64,
    pub influencer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub platform: String,
    pub content_type: String,
    pub scheduled_date: NaiveDate,
    pub objectives: serde_json::Value,
    pub budget: Option<Decimal>,
}

/// Returns non-deleted schedules for a campaign, ordered by scheduled date.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_schedules(
    pool: &PgPool,
    campaign_id: i64,
    status: Option<&str>,
) -> Result<Vec<ScheduleRow>, DbError> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} \
         FROM campaign_schedules \
         WHERE campaign_id = $1 AND deleted_at IS NULL \
           AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY scheduled_date, id"
    ))
    .bind(campaign_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single non-deleted schedule by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_schedule(pool: &PgPool, public_id: Uuid) -> Result<Option<ScheduleRow>, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} \
         FROM campaign_schedules \
         WHERE public_id = $1 AND deleted_at IS NULL"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts one schedule row and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_schedule(pool: &PgPool, new: &NewSchedule) -> Result<ScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "INSERT INTO campaign_schedules \
           (campaign_id, influencer_id, title, description, platform, content_type, \
            scheduled_date, objectives, budget) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {SCHEDULE_COLUMNS}"
    ))
    .bind(new.campaign_id)
    .bind(new.influencer_id)
    .bind(&new.title)
    .bind(new.description.as_deref())
    .bind(&new.platform)
    .bind(&new.content_type)
    .bind(new.scheduled_date)
    .bind(&new.objectives)
    .bind(new.budget)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Inserts a batch of schedule drafts inside one transaction.
///
/// Used by the import commit step: either every valid row lands or none do.
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the transaction is rolled back.
pub async fn insert_schedule_drafts(
    pool: &PgPool,
    drafts: &[NewSchedule],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for draft in drafts {
        sqlx::query(
            "INSERT INTO campaign_schedules \
               (campaign_id, influencer_id, title, description, platform, content_type, \
                scheduled_date, objectives, budget) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(draft.campaign_id)
        .bind(draft.influencer_id)
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(&draft.platform)
        .bind(&draft.content_type)
        .bind(draft.scheduled_date)
        .bind(&draft.objectives)
        .bind(draft.budget)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(drafts.len())
}

/// Sparse update of a schedule; `None` preserves the existing value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // mirrors the row's updatable fields
pub async fn update_schedule(
    pool: &PgPool,
    schedule_id: i64,
    title: Option<&str>,
    description: Option<&str>,
    scheduled_date: Option<NaiveDate>,
    objectives: Option<&serde_json::Value>,
    metrics: Option<&serde_json::Value>,
    budget: Option<Decimal>,
    actual_cost: Option<Decimal>,
    content_url: Option<&str>,
    status: Option<&str>,
) -> Result<ScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "UPDATE campaign_schedules \
         SET title          = COALESCE($2, title), \
             description    = COALESCE($3, description), \
             scheduled_date = COALESCE($4, scheduled_date), \
             objectives     = COALESCE($5, objectives), \
             metrics        = COALESCE($6, metrics), \
             budget         = COALESCE($7, budget), \
             actual_cost    = COALESCE($8, actual_cost), \
             content_url    = COALESCE($9, content_url), \
             status         = COALESCE($10, status), \
             updated_at     = NOW() \
         WHERE id = $1 \
         RETURNING {SCHEDULE_COLUMNS}"
    ))
    .bind(schedule_id)
    .bind(title)
    .bind(description)
    .bind(scheduled_date)
    .bind(objectives)
    .bind(metrics)
    .bind(budget)
    .bind(actual_cost)
    .bind(content_url)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Soft-deletes a schedule.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_schedule(pool: &PgPool, schedule_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE campaign_schedules \
         SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(schedule_id)
    .execute(pool)
    .await?;
    Ok(())
}
