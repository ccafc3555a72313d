//! Thin proxy over the YouTube Data API client.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use campdb_youtube::{ChannelStats, VideoStats, YoutubeClient};

use crate::middleware::RequestId;

use super::{content::map_youtube_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct VideoBody {
    video_id: String,
    title: String,
    channel_id: String,
    published_at: Option<chrono::DateTime<chrono::Utc>>,
    views: u64,
    likes: u64,
    comments: u64,
    duration: Option<String>,
}

impl From<VideoStats> for VideoBody {
    fn from(stats: VideoStats) -> Self {
        Self {
            video_id: stats.video_id,
            title: stats.title,
            channel_id: stats.channel_id,
            published_at: stats.published_at,
            views: stats.views,
            likes: stats.likes,
            comments: stats.comments,
            duration: stats.duration,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChannelBody {
    channel_id: String,
    title: String,
    subscribers: u64,
    videos: u64,
    total_views: u64,
}

impl From<ChannelStats> for ChannelBody {
    fn from(stats: ChannelStats) -> Self {
        Self {
            channel_id: stats.channel_id,
            title: stats.title,
            subscribers: stats.subscribers,
            videos: stats.videos,
            total_views: stats.total_views,
        }
    }
}

fn require_client<'a>(state: &'a AppState, rid: &str) -> Result<&'a YoutubeClient, ApiError> {
    state.youtube.as_deref().ok_or_else(|| {
        ApiError::new(
            rid,
            "service_unavailable",
            "YouTube integration is not configured (missing API key)",
        )
    })
}

/// GET /api/v1/youtube/videos/{id}
pub(super) async fn get_video(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VideoBody>>, ApiError> {
    let rid = &req_id.0;
    let client = require_client(&state, rid)?;

    let stats = client
        .get_video(&id)
        .await
        .map_err(|e| map_youtube_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: VideoBody::from(stats),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/youtube/channels/{id}
pub(super) async fn get_channel(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ChannelBody>>, ApiError> {
    let rid = &req_id.0;
    let client = require_client(&state, rid)?;

    let stats = client
        .get_channel(&id)
        .await
        .map_err(|e| map_youtube_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: ChannelBody::from(stats),
        meta: ResponseMeta::new(req_id.0),
    }))
}
