//! Database operations for `notifications` and `notification_preferences`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `notifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub body: Option<String>,
    pub status: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PreferencesRow {
    pub user_id: String,
    pub campaign_alerts: bool,
    pub content_alerts: bool,
    pub metric_alerts: bool,
    pub report_alerts: bool,
    pub updated_at: DateTime<Utc>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, public_id, user_id, kind, priority, title, body, status, read_at, created_at";

/// Lists a user's notifications, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_notifications(
    pool: &PgPool,
    user_id: &str,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<NotificationRow>, DbError> {
    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} \
         FROM notifications \
         WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3"
    ))
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a notification and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_notification(
    pool: &PgPool,
    user_id: &str,
    kind: &str,
    priority: &str,
    title: &str,
    body: Option<&str>,
) -> Result<NotificationRow, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "INSERT INTO notifications (user_id, kind, priority, title, body) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(user_id)
    .bind(kind)
    .bind(priority)
    .bind(title)
    .bind(body)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Marks one notification as read. Returns `false` when the id does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mark_notification_read(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE notifications \
         SET status = 'read', read_at = NOW() \
         WHERE public_id = $1 AND status = 'unread'",
    )
    .bind(public_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Marks all of a user's unread notifications as read; returns how many changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mark_all_read(pool: &PgPool, user_id: &str) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE notifications \
         SET status = 'read', read_at = NOW() \
         WHERE user_id = $1 AND status = 'unread'",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Returns a user's notification preferences, falling back to the defaults
/// (all alert categories enabled) when no row exists yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_preferences(pool: &PgPool, user_id: &str) -> Result<PreferencesRow, DbError> {
    let row = sqlx::query_as::<_, PreferencesRow>(
        "SELECT user_id, campaign_alerts, content_alerts, metric_alerts, report_alerts, updated_at \
         FROM notification_preferences \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.unwrap_or_else(|| PreferencesRow {
        user_id: user_id.to_owned(),
        campaign_alerts: true,
        content_alerts: true,
        metric_alerts: true,
        report_alerts: true,
        updated_at: Utc::now(),
    }))
}

/// Creates or replaces a user's notification preferences.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_preferences(
    pool: &PgPool,
    user_id: &str,
    campaign_alerts: bool,
    content_alerts: bool,
    metric_alerts: bool,
    report_alerts: bool,
) -> Result<PreferencesRow, DbError> {
    let row = sqlx::query_as::<_, PreferencesRow>(
        "INSERT INTO notification_preferences \
           (user_id, campaign_alerts, content_alerts, metric_alerts, report_alerts, updated_at) \
         VALUES ($1, $2, $3, $4, $5, NOW()) \
         ON CONFLICT (user_id) DO UPDATE \
         SET campaign_alerts = EXCLUDED.campaign_alerts, \
             content_alerts  = EXCLUDED.content_alerts, \
             metric_alerts   = EXCLUDED.metric_alerts, \
             report_alerts   = EXCLUDED.report_alerts, \
             updated_at      = NOW() \
         RETURNING user_id, campaign_alerts, content_alerts, metric_alerts, \
                   report_alerts, updated_at",
    )
    .bind(user_id)
    .bind(campaign_alerts)
    .bind(content_alerts)
    .bind(metric_alerts)
    .bind(report_alerts)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
