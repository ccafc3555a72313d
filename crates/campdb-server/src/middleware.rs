use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use campdb_core::{AppConfig, Environment};
use tokio::sync::Mutex;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID carried through handler extensions and echoed back on the
/// response as `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token allow-list, sourced from [`AppConfig::api_keys`].
///
/// An empty list means auth is skipped entirely; [`AuthState::from_config`]
/// only permits that in development.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<[String]>,
}

impl AuthState {
    /// # Errors
    ///
    /// Fails when no API keys are configured outside development.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if config.api_keys.is_empty() {
            if config.env != Environment::Development {
                anyhow::bail!(
                    "CAMPDB_API_KEYS is required outside development; \
                     provide comma-separated bearer tokens"
                );
            }
            tracing::warn!("no API keys configured; bearer auth disabled in development");
        }

        Ok(Self {
            keys: config.api_keys.clone().into(),
        })
    }

    /// An auth layer that admits every request. Test servers use this.
    #[must_use]
    pub fn disabled() -> Self {
        Self { keys: Arc::new([]) }
    }

    fn enforced(&self) -> bool {
        !self.keys.is_empty()
    }

    fn admits(&self, token: &str) -> bool {
        self.keys.iter().any(|key| key == token)
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    hits: usize,
}

/// Fixed-window request limiter with one bucket per bearer token, so a noisy
/// client cannot starve the others. Unauthenticated requests share a single
/// anonymous bucket.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_hits: usize,
    window: Duration,
    buckets: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_hits: usize, window: Duration) -> Self {
        Self {
            max_hits,
            window,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Records a hit against `key`'s bucket; false once the bucket is over
    /// budget for the current window. Expired buckets are pruned on the way in.
    async fn try_admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        buckets.retain(|_, window| now.duration_since(window.opened_at) < self.window);

        let window = buckets.entry(key.to_owned()).or_insert(Window {
            opened_at: now,
            hits: 0,
        });
        if window.hits >= self.max_hits {
            return false;
        }
        window.hits += 1;
        true
    }
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    let body = serde_json::json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reuses an incoming `x-request-id` header when present, otherwise mints a
/// `UUIDv4`. The ID lands in request extensions as [`RequestId`] and on the
/// response header.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enforced() {
        return next.run(req).await;
    }

    match bearer_token(&req) {
        Some(token) if auth.admits(token) => next.run(req).await,
        _ => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = bearer_token(&req).unwrap_or("anonymous").to_owned();
    if limiter.try_admit(&key).await {
        next.run(req).await
    } else {
        reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        )
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn test_config(env: Environment, keys: &[&str]) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/campdb".to_owned(),
            env,
            bind_addr: "127.0.0.1:3000".parse().expect("addr"),
            log_level: "info".to_owned(),
            youtube_api_key: None,
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            youtube_timeout_secs: 5,
            youtube_max_retries: 1,
            import_max_bytes: 1024,
            worker_batch_size: 5,
            api_keys: keys.iter().map(|k| (*k).to_owned()).collect(),
            rate_limit_max_requests: 120,
            rate_limit_window_secs: 60,
        }
    }

    fn request_with_auth(header: Option<&str>) -> Request {
        let builder = Request::builder().uri("/api/v1/brands");
        let builder = match header {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        };
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn bearer_token_strips_scheme_and_whitespace() {
        let req = request_with_auth(Some("Bearer  alpha "));
        assert_eq!(bearer_token(&req), Some("alpha"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blank_tokens() {
        assert_eq!(bearer_token(&request_with_auth(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request_with_auth(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&request_with_auth(None)), None);
    }

    #[test]
    fn auth_from_config_admits_configured_keys_only() {
        let auth = AuthState::from_config(&test_config(Environment::Development, &["alpha"]))
            .expect("auth");
        assert!(auth.enforced());
        assert!(auth.admits("alpha"));
        assert!(!auth.admits("beta"));
    }

    #[test]
    fn auth_from_config_allows_empty_keys_in_development_only() {
        let dev = AuthState::from_config(&test_config(Environment::Development, &[]))
            .expect("dev config");
        assert!(!dev.enforced());

        assert!(AuthState::from_config(&test_config(Environment::Production, &[])).is_err());
    }

    #[tokio::test]
    async fn rate_limiter_buckets_are_per_token() {
        let limiter = RateLimitState::new(2, Duration::from_secs(60));

        assert!(limiter.try_admit("alpha").await);
        assert!(limiter.try_admit("alpha").await);
        assert!(!limiter.try_admit("alpha").await);

        // A different caller is unaffected by alpha's exhausted bucket.
        assert!(limiter.try_admit("beta").await);
    }

    #[tokio::test]
    async fn rate_limiter_expired_windows_reset() {
        let limiter = RateLimitState::new(1, Duration::ZERO);

        // With a zero-length window every bucket expires immediately.
        assert!(limiter.try_admit("alpha").await);
        assert!(limiter.try_admit("alpha").await);
    }
}
