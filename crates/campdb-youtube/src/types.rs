//! Public statistics types and the raw Data API response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a video's metadata and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStats {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub published_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// ISO 8601 duration as reported by the API, e.g. `PT4M13S`.
    pub duration: Option<String>,
}

/// Snapshot of a channel's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub channel_id: String,
    pub title: String,
    pub subscribers: u64,
    pub videos: u64,
    pub total_views: u64,
}

// ---------------------------------------------------------------------------
// Raw Data API shapes. Counters arrive as decimal strings.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSnippet {
    pub title: String,
    pub channel_id: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoStatistics {
    #[serde(default)]
    pub view_count: Option<String>,
    #[serde(default)]
    pub like_count: Option<String>,
    #[serde(default)]
    pub comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelSnippet {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelStatistics {
    #[serde(default)]
    pub subscriber_count: Option<String>,
    #[serde(default)]
    pub video_count: Option<String>,
    #[serde(default)]
    pub view_count: Option<String>,
}

/// Parses a decimal-string counter, treating absent or malformed values as 0.
pub(crate) fn count(raw: Option<&String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

impl VideoItem {
    pub(crate) fn into_stats(self) -> VideoStats {
        let stats = self.statistics.unwrap_or_default();
        VideoStats {
            video_id: self.id,
            title: self.snippet.title,
            channel_id: self.snippet.channel_id,
            published_at: self.snippet.published_at,
            views: count(stats.view_count.as_ref()),
            likes: count(stats.like_count.as_ref()),
            comments: count(stats.comment_count.as_ref()),
            duration: self.content_details.and_then(|d| d.duration),
        }
    }
}

impl ChannelItem {
    pub(crate) fn into_stats(self) -> ChannelStats {
        let stats = self.statistics.unwrap_or_default();
        ChannelStats {
            channel_id: self.id,
            title: self.snippet.title,
            subscribers: count(stats.subscriber_count.as_ref()),
            videos: count(stats.video_count.as_ref()),
            total_views: count(stats.view_count.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_parses_decimal_strings_and_defaults_to_zero() {
        assert_eq!(count(Some(&"12345".to_owned())), 12_345);
        assert_eq!(count(Some(&"not a number".to_owned())), 0);
        assert_eq!(count(None), 0);
    }

    #[test]
    fn video_item_maps_into_stats() {
        let item: VideoItem = serde_json::from_value(serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Test Video",
                "channelId": "UC123",
                "publishedAt": "2024-03-15T10:00:00Z"
            },
            "statistics": {
                "viewCount": "1000",
                "likeCount": "50",
                "commentCount": "7"
            },
            "contentDetails": { "duration": "PT4M13S" }
        }))
        .unwrap();

        let stats = item.into_stats();
        assert_eq!(stats.video_id, "dQw4w9WgXcQ");
        assert_eq!(stats.views, 1000);
        assert_eq!(stats.likes, 50);
        assert_eq!(stats.comments, 7);
        assert_eq!(stats.duration.as_deref(), Some("PT4M13S"));
    }

    #[test]
    fn missing_statistics_yield_zero_counters() {
        let item: VideoItem = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "snippet": { "title": "Bare", "channelId": "UC9" }
        }))
        .unwrap();
        let stats = item.into_stats();
        assert_eq!(stats.views, 0);
        assert_eq!(stats.published_at, None);
        assert_eq!(stats.duration, None);
    }
}
