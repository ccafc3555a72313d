use thiserror::Error;

/// Errors returned by the `YouTube` Data API client.
#[derive(Debug, Error)]
pub enum YoutubeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned its error envelope with a code and message.
    #[error("YouTube API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// The daily API quota is exhausted (`reason: "quotaExceeded"`).
    #[error("YouTube API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The requested video or channel does not exist (empty `items`).
    #[error("YouTube resource not found: {0}")]
    NotFound(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
