//! `YouTube` Data API v3 client for video and channel statistics.
//!
//! Wraps `reqwest` with typed response deserialization, quota-aware error
//! handling, and retry with exponential back-off for transient failures.

mod client;
mod error;
mod retry;
mod types;
mod video_url;

pub use client::YoutubeClient;
pub use error::YoutubeError;
pub use types::{ChannelStats, VideoStats};
pub use video_url::extract_video_id;
