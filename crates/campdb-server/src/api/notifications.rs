//! In-app notifications and per-user alert preferences.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct NotificationItem {
    id: Uuid,
    user_id: String,
    kind: String,
    priority: String,
    title: String,
    body: Option<String>,
    status: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<campdb_db::NotificationRow> for NotificationItem {
    fn from(row: campdb_db::NotificationRow) -> Self {
        Self {
            id: row.public_id,
            user_id: row.user_id,
            kind: row.kind,
            priority: row.priority,
            title: row.title,
            body: row.body,
            status: row.status,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PreferencesBody {
    user_id: String,
    campaign_alerts: bool,
    content_alerts: bool,
    metric_alerts: bool,
    report_alerts: bool,
    updated_at: DateTime<Utc>,
}

impl From<campdb_db::PreferencesRow> for PreferencesBody {
    fn from(row: campdb_db::PreferencesRow) -> Self {
        Self {
            user_id: row.user_id,
            campaign_alerts: row.campaign_alerts,
            content_alerts: row.content_alerts,
            metric_alerts: row.metric_alerts,
            report_alerts: row.report_alerts,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NotificationQuery {
    pub user_id: String,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateNotificationRequest {
    pub user_id: String,
    pub kind: String,
    pub priority: Option<String>,
    pub title: String,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PutPreferencesRequest {
    pub campaign_alerts: bool,
    pub content_alerts: bool,
    pub metric_alerts: bool,
    pub report_alerts: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct MarkAllReadBody {
    pub updated: u64,
}

fn validate_priority(req_id: &str, value: &str) -> Result<(), ApiError> {
    match value {
        "low" | "normal" | "high" => Ok(()),
        _ => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("priority must be 'low', 'normal', or 'high', got '{value}'"),
        )),
    }
}

/// GET /api/v1/notifications?user_id=...
pub(super) async fn list_notifications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationItem>>>, ApiError> {
    let rid = &req_id.0;
    if let Some(status) = &query.status {
        if !matches!(status.as_str(), "unread" | "read" | "archived") {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("status must be 'unread', 'read', or 'archived', got '{status}'"),
            ));
        }
    }

    let rows = campdb_db::list_notifications(
        &state.pool,
        &query.user_id,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(NotificationItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/notifications
pub(super) async fn create_notification(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationItem>>), ApiError> {
    let rid = &req_id.0;

    let title = body.title.trim().to_owned();
    if title.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "title is required"));
    }
    if body.user_id.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "user_id is required"));
    }
    let priority = body.priority.as_deref().unwrap_or("normal");
    validate_priority(rid, priority)?;

    let row = campdb_db::create_notification(
        &state.pool,
        body.user_id.trim(),
        body.kind.trim(),
        priority,
        &title,
        body.body.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: NotificationItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/notifications/{id}/read
pub(super) async fn mark_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let updated = campdb_db::mark_notification_read(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            &req_id.0,
            "not_found",
            "unread notification not found",
        ))
    }
}

/// POST /api/v1/notifications/read-all?user_id=...
pub(super) async fn mark_all_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<MarkAllReadBody>>, ApiError> {
    let updated = campdb_db::mark_all_read(&state.pool, &query.user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MarkAllReadBody { updated },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/notifications/preferences/{user_id}
pub(super) async fn get_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<PreferencesBody>>, ApiError> {
    let row = campdb_db::get_preferences(&state.pool, &user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: PreferencesBody::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/notifications/preferences/{user_id}
pub(super) async fn put_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Json(body): Json<PutPreferencesRequest>,
) -> Result<Json<ApiResponse<PreferencesBody>>, ApiError> {
    let row = campdb_db::upsert_preferences(
        &state.pool,
        &user_id,
        body.campaign_alerts,
        body.content_alerts,
        body.metric_alerts,
        body.report_alerts,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: PreferencesBody::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::tests::{body_json, send, test_app};

    async fn seed_notification(pool: &sqlx::PgPool, user: &str, title: &str) -> String {
        let created = body_json(
            send(
                test_app(pool.clone()),
                "POST",
                "/api/v1/notifications",
                Some(serde_json::json!({
                    "user_id": user,
                    "kind": "campaign",
                    "title": title
                })),
            )
            .await,
        )
        .await;
        created["data"]["id"].as_str().expect("id").to_owned()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn notifications_are_scoped_to_the_user(pool: sqlx::PgPool) {
        seed_notification(&pool, "maria", "Campaign launched").await;
        seed_notification(&pool, "jorge", "Budget warning").await;

        let json = body_json(
            send(
                test_app(pool),
                "GET",
                "/api/v1/notifications?user_id=maria",
                None,
            )
            .await,
        )
        .await;
        let rows = json["data"].as_array().expect("data array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Campaign launched");
        assert_eq!(rows[0]["status"], "unread");
        assert_eq!(rows[0]["priority"], "normal");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn archived_is_a_valid_status_filter(pool: sqlx::PgPool) {
        seed_notification(&pool, "maria", "Campaign launched").await;

        let response = send(
            test_app(pool.clone()),
            "GET",
            "/api/v1/notifications?user_id=maria&status=archived",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["data"].as_array().expect("data array").is_empty());

        let rejected = send(
            test_app(pool),
            "GET",
            "/api/v1/notifications?user_id=maria&status=deleted",
            None,
        )
        .await;
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn marking_read_twice_is_404(pool: sqlx::PgPool) {
        let id = seed_notification(&pool, "maria", "Campaign launched").await;

        let first = send(
            test_app(pool.clone()),
            "POST",
            &format!("/api/v1/notifications/{id}/read"),
            None,
        )
        .await;
        assert_eq!(first.status(), StatusCode::NO_CONTENT);

        let second = send(
            test_app(pool),
            "POST",
            &format!("/api/v1/notifications/{id}/read"),
            None,
        )
        .await;
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn read_all_reports_how_many_changed(pool: sqlx::PgPool) {
        seed_notification(&pool, "maria", "One").await;
        seed_notification(&pool, "maria", "Two").await;
        seed_notification(&pool, "jorge", "Other user").await;

        let json = body_json(
            send(
                test_app(pool),
                "POST",
                "/api/v1/notifications/read-all?user_id=maria",
                None,
            )
            .await,
        )
        .await;
        assert_eq!(json["data"]["updated"], 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn preferences_default_to_all_enabled(pool: sqlx::PgPool) {
        let json = body_json(
            send(
                test_app(pool),
                "GET",
                "/api/v1/notifications/preferences/maria",
                None,
            )
            .await,
        )
        .await;
        assert_eq!(json["data"]["campaign_alerts"], true);
        assert_eq!(json["data"]["report_alerts"], true);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn preferences_round_trip(pool: sqlx::PgPool) {
        send(
            test_app(pool.clone()),
            "PUT",
            "/api/v1/notifications/preferences/maria",
            Some(serde_json::json!({
                "campaign_alerts": true,
                "content_alerts": false,
                "metric_alerts": false,
                "report_alerts": true
            })),
        )
        .await;

        let json = body_json(
            send(
                test_app(pool),
                "GET",
                "/api/v1/notifications/preferences/maria",
                None,
            )
            .await,
        )
        .await;
        assert_eq!(json["data"]["content_alerts"], false);
        assert_eq!(json["data"]["report_alerts"], true);
    }
}
