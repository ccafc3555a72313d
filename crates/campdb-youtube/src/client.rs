//! HTTP client for the `YouTube` Data API v3.
//!
//! Wraps `reqwest` with API key management, the Google error envelope, and
//! retry with back-off for transient failures. Quota exhaustion is surfaced
//! as [`YoutubeError::QuotaExceeded`] and never retried.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::YoutubeError;
use crate::retry::retry_with_backoff;
use crate::types::{ChannelItem, ChannelStats, ListResponse, VideoItem, VideoStats};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const BACKOFF_BASE_MS: u64 = 1_000;

/// Client for the `YouTube` Data API v3.
///
/// Manages the HTTP client, API key, and base URL. Use [`YoutubeClient::new`]
/// for production or [`YoutubeClient::with_base_url`] to point at a mock
/// server in tests.
pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
}

impl YoutubeClient {
    /// Creates a new client pointed at the production Data API.
    ///
    /// # Errors
    ///
    /// Returns [`YoutubeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, YoutubeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`YoutubeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`YoutubeError::ApiError`] if `base_url` is
    /// not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, YoutubeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("campdb/0.1 (campaign-analytics)")
            .build()?;

        // Normalise: the base URL must end with one slash so that join()
        // appends resource segments instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| YoutubeError::ApiError {
            code: 0,
            message: format!("invalid base URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 3,
        })
    }

    /// Overrides the number of back-off retries for transient errors.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Fetches a video's snippet, statistics, and duration by video id.
    ///
    /// # Errors
    ///
    /// - [`YoutubeError::NotFound`] if the API returns no items for the id.
    /// - [`YoutubeError::QuotaExceeded`] when the daily quota is exhausted.
    /// - [`YoutubeError::ApiError`] for other Google error envelopes.
    /// - [`YoutubeError::Http`] on network failure.
    /// - [`YoutubeError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn get_video(&self, video_id: &str) -> Result<VideoStats, YoutubeError> {
        let url = self.build_url(
            "videos",
            &[("part", "snippet,statistics,contentDetails"), ("id", video_id)],
        );
        let body = retry_with_backoff(self.max_retries, BACKOFF_BASE_MS, || {
            self.request_json(&url)
        })
        .await?;

        let envelope: ListResponse<VideoItem> =
            serde_json::from_value(body).map_err(|e| YoutubeError::Deserialize {
                context: format!("videos(id={video_id})"),
                source: e,
            })?;

        envelope
            .items
            .into_iter()
            .next()
            .map(VideoItem::into_stats)
            .ok_or_else(|| YoutubeError::NotFound(video_id.to_owned()))
    }

    /// Fetches a channel's snippet and statistics by channel id.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`YoutubeClient::get_video`].
    pub async fn get_channel(&self, channel_id: &str) -> Result<ChannelStats, YoutubeError> {
        let url = self.build_url(
            "channels",
            &[("part", "snippet,statistics"), ("id", channel_id)],
        );
        let body = retry_with_backoff(self.max_retries, BACKOFF_BASE_MS, || {
            self.request_json(&url)
        })
        .await?;

        let envelope: ListResponse<ChannelItem> =
            serde_json::from_value(body).map_err(|e| YoutubeError::Deserialize {
                context: format!("channels(id={channel_id})"),
                source: e,
            })?;

        envelope
            .items
            .into_iter()
            .next()
            .map(ChannelItem::into_stats)
            .ok_or_else(|| YoutubeError::NotFound(channel_id.to_owned()))
    }

    /// Builds the resource URL with properly percent-encoded query parameters.
    fn build_url(&self, resource: &str, params: &[(&str, &str)]) -> Url {
        // base_url always ends with a slash, so join cannot fail on a plain
        // resource segment.
        let mut url = self
            .base_url
            .join(resource)
            .unwrap_or_else(|_| self.base_url.clone());
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("key", &self.api_key);
        }
        url
    }

    /// Sends a GET request and parses the body as JSON, translating the
    /// Google error envelope on non-2xx statuses.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, YoutubeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::envelope_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| YoutubeError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    /// Maps a non-2xx response to the closest typed error. A 403 whose first
    /// error reason is `quotaExceeded` (or `dailyLimitExceeded`) becomes
    /// [`YoutubeError::QuotaExceeded`].
    fn envelope_error(status: StatusCode, body: &str) -> YoutubeError {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error")
            .to_owned();
        let reason = error
            .and_then(|e| e.get("errors"))
            .and_then(|errs| errs.get(0))
            .and_then(|first| first.get("reason"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        if matches!(reason, "quotaExceeded" | "dailyLimitExceeded" | "rateLimitExceeded") {
            return YoutubeError::QuotaExceeded(message);
        }

        YoutubeError::ApiError {
            code: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> YoutubeClient {
        YoutubeClient::with_base_url("test-key", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_appends_resource_and_query() {
        let client = test_client("https://www.googleapis.com/youtube/v3");
        let url = client.build_url("videos", &[("part", "snippet"), ("id", "abc")]);
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/youtube/v3/videos?part=snippet&id=abc&key=test-key"
        );
    }

    #[test]
    fn build_url_encodes_special_characters() {
        let client = test_client("https://www.googleapis.com/youtube/v3");
        let url = client.build_url("videos", &[("part", "snippet,statistics")]);
        assert!(
            url.as_str().contains("part=snippet%2Cstatistics"),
            "query param should be percent-encoded: {url}"
        );
    }

    #[test]
    fn quota_envelope_maps_to_quota_exceeded() {
        let body = serde_json::json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{ "reason": "quotaExceeded", "domain": "youtube.quota" }]
            }
        })
        .to_string();
        let err = YoutubeClient::envelope_error(StatusCode::FORBIDDEN, &body);
        assert!(matches!(err, YoutubeError::QuotaExceeded(_)));
    }

    #[test]
    fn plain_envelope_maps_to_api_error() {
        let body = serde_json::json!({
            "error": {
                "code": 400,
                "message": "Invalid id",
                "errors": [{ "reason": "invalidParameter" }]
            }
        })
        .to_string();
        let err = YoutubeClient::envelope_error(StatusCode::BAD_REQUEST, &body);
        match err {
            YoutubeError::ApiError { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "Invalid id");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_still_yields_api_error() {
        let err = YoutubeClient::envelope_error(StatusCode::BAD_GATEWAY, "<html>502</html>");
        match err {
            YoutubeError::ApiError { code, message } => {
                assert_eq!(code, 502);
                assert_eq!(message, "unknown error");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
