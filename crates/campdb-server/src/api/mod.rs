mod admin;
mod analytics;
mod brands;
mod campaigns;
mod content;
mod metrics;
mod notifications;
mod reports;
mod schedules;
mod youtube;

pub(crate) use reports::{GENERATE_REPORT_JOB, REPORTS_QUEUE};

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Absent when `YOUTUBE_API_KEY` is not configured; the routes that need
    /// it respond 503.
    pub youtube: Option<Arc<campdb_youtube::YoutubeClient>>,
    pub import_max_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Machine-readable context, e.g. the job state that blocked a queue
    /// transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "unprocessable" => StatusCode::UNPROCESSABLE_ENTITY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "bad_gateway" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &campdb_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Translates a Postgres unique violation (23505) into a 409; everything else
/// falls through to [`map_db_error`].
pub(super) fn map_unique_violation(
    req_id: &str,
    error: &campdb_db::DbError,
    conflict_message: &str,
) -> ApiError {
    if let campdb_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = error {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::new(req_id, "conflict", conflict_message);
        }
    }
    map_db_error(req_id.to_owned(), error)
}

/// Looks up a campaign by public id, mapping absence to 404.
pub(super) async fn resolve_campaign(
    pool: &PgPool,
    req_id: &str,
    public_id: Uuid,
) -> Result<campdb_db::CampaignRow, ApiError> {
    campdb_db::get_campaign(pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", "campaign not found"))
}

/// Looks up a brand by slug, mapping absence to 404.
pub(super) async fn resolve_brand(
    pool: &PgPool,
    req_id: &str,
    slug: &str,
) -> Result<campdb_db::BrandRow, ApiError> {
    campdb_db::get_brand_by_slug(pool, slug)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", "brand not found"))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

#[allow(clippy::too_many_lines)] // the route table reads best in one place
fn protected_router(
    auth: AuthState,
    rate_limit: RateLimitState,
    import_max_bytes: usize,
) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/brands",
            get(brands::list_brands).post(brands::create_brand),
        )
        .route(
            "/api/v1/brands/{slug}",
            get(brands::get_brand)
                .patch(brands::update_brand)
                .delete(brands::deactivate_brand),
        )
        .route(
            "/api/v1/brands/{slug}/campaigns",
            get(brands::list_brand_campaigns).post(brands::attach_campaign),
        )
        .route(
            "/api/v1/brands/{slug}/campaigns/{campaign_id}",
            axum::routing::patch(brands::update_campaign_link).delete(brands::detach_campaign),
        )
        .route(
            "/api/v1/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}",
            get(campaigns::get_campaign)
                .patch(campaigns::update_campaign)
                .delete(campaigns::deactivate_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}/influencers",
            get(campaigns::list_influencers).post(campaigns::attach_influencer),
        )
        .route(
            "/api/v1/campaigns/{id}/schedules",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route(
            "/api/v1/campaigns/{id}/schedules/import",
            post(schedules::import_schedules)
                .layer(DefaultBodyLimit::max(import_max_bytes.saturating_add(64 * 1024))),
        )
        .route(
            "/api/v1/schedules/{id}",
            get(schedules::get_schedule)
                .patch(schedules::update_schedule)
                .delete(schedules::delete_schedule),
        )
        .route(
            "/api/v1/content",
            get(content::list_content).post(content::create_content),
        )
        .route(
            "/api/v1/content/{id}",
            get(content::get_content)
                .patch(content::update_content)
                .delete(content::deactivate_content),
        )
        .route(
            "/api/v1/content/{id}/metrics",
            get(content::list_content_metrics).post(content::append_content_metric),
        )
        .route(
            "/api/v1/content/{id}/sync-youtube",
            post(content::sync_youtube),
        )
        .route(
            "/api/v1/metrics",
            get(metrics::list_metrics).post(metrics::create_metric),
        )
        .route("/api/v1/analytics/overview", get(analytics::overview))
        .route(
            "/api/v1/analytics/campaigns/{id}",
            get(analytics::campaign_rollup),
        )
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(notifications::mark_read),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/preferences/{user_id}",
            get(notifications::get_preferences).put(notifications::put_preferences),
        )
        .route(
            "/api/v1/reports",
            get(reports::list_reports).post(reports::create_report),
        )
        .route("/api/v1/reports/{id}", get(reports::get_report))
        .route(
            "/api/v1/report-schedules",
            get(reports::list_report_schedules).post(reports::create_report_schedule),
        )
        .route(
            "/api/v1/report-schedules/{id}",
            axum::routing::patch(reports::update_report_schedule)
                .delete(reports::deactivate_report_schedule),
        )
        .route("/api/v1/admin/queues/{queue}/stats", get(admin::queue_stats))
        .route("/api/v1/admin/queues/{queue}/jobs", get(admin::list_jobs))
        .route(
            "/api/v1/admin/queues/{queue}/jobs/{id}",
            get(admin::job_info).delete(admin::remove_job),
        )
        .route(
            "/api/v1/admin/queues/{queue}/jobs/{id}/pause",
            post(admin::pause_job),
        )
        .route(
            "/api/v1/admin/queues/{queue}/jobs/{id}/resume",
            post(admin::resume_job),
        )
        .route(
            "/api/v1/admin/queues/{queue}/jobs/{id}/retry",
            post(admin::retry_job),
        )
        .route(
            "/api/v1/admin/queues/{queue}/jobs/{id}/promote",
            post(admin::promote_job),
        )
        .route("/api/v1/youtube/videos/{video_id}", get(youtube::get_video))
        .route(
            "/api/v1/youtube/channels/{channel_id}",
            get(youtube::get_channel),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));
    let import_max_bytes = state.import_max_bytes;

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit, import_max_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match campdb_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    pub(crate) fn test_state(pool: sqlx::PgPool) -> AppState {
        AppState {
            pool,
            youtube: None,
            import_max_bytes: 10 * 1024 * 1024,
        }
    }

    pub(crate) fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = crate::middleware::AuthState::disabled();
        build_app(test_state(pool), auth, RateLimitState::new(120, Duration::from_secs(60)))
    }

    pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    pub(crate) async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        app.oneshot(request).await.expect("response")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_unprocessable_maps_to_422() {
        let response = ApiError::new("req-1", "unprocessable", "cannot sync").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn api_error_details_serialize_only_when_present() {
        let bare = ApiError::new("req-1", "bad_request", "nope");
        let json = serde_json::to_value(&bare).expect("serialize");
        assert!(json["error"].get("details").is_none());

        let detailed = ApiError::new("req-1", "bad_request", "nope")
            .with_details(serde_json::json!({ "job_state": "processing" }));
        let json = serde_json::to_value(&detailed).expect("serialize");
        assert_eq!(json["error"]["details"]["job_state"], "processing");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok_with_live_database(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn request_id_header_is_echoed(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "fixed-id-123")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.as_bytes()),
            Some(b"fixed-id-123".as_slice())
        );
    }
}
