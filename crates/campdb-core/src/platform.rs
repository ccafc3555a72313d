//! Social platform vocabulary and per-platform content-type allow-lists.
//!
//! Used both by the schedule importer (Excel cell validation) and the API
//! layer (request-body validation), so the two surfaces cannot drift apart.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    Tiktok,
    Twitter,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Youtube,
        Platform::Tiktok,
        Platform::Twitter,
        Platform::Facebook,
    ];

    /// Parse a platform name case-insensitively after trimming whitespace.
    ///
    /// Only exact names match; abbreviations like `"insta"` are rejected.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Platform> {
        match raw.trim().to_lowercase().as_str() {
            "instagram" => Some(Platform::Instagram),
            "youtube" => Some(Platform::Youtube),
            "tiktok" => Some(Platform::Tiktok),
            "twitter" => Some(Platform::Twitter),
            "facebook" => Some(Platform::Facebook),
            _ => None,
        }
    }

    /// Content types this platform accepts.
    #[must_use]
    pub fn allowed_content_types(self) -> &'static [&'static str] {
        match self {
            Platform::Instagram => &["post", "story", "reel", "live"],
            Platform::Youtube => &["video", "short"],
            Platform::Tiktok => &["video", "live"],
            Platform::Twitter => &["tweet", "thread"],
            Platform::Facebook => &["post", "story", "video", "live"],
        }
    }

    /// Whether `raw` (trimmed, case-insensitive) is a valid content type here.
    #[must_use]
    pub fn accepts_content_type(self, raw: &str) -> bool {
        let normalized = raw.trim().to_lowercase();
        self.allowed_content_types().contains(&normalized.as_str())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::Youtube => write!(f, "youtube"),
            Platform::Tiktok => write!(f, "tiktok"),
            Platform::Twitter => write!(f, "twitter"),
            Platform::Facebook => write!(f, "facebook"),
        }
    }
}

/// A normalized (lowercased, trimmed) content-type string paired with the
/// platform it was validated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub platform: Platform,
    pub name: String,
}

impl ContentType {
    /// Validate `raw` against `platform`'s allow-list and normalize it.
    #[must_use]
    pub fn parse(platform: Platform, raw: &str) -> Option<ContentType> {
        let normalized = raw.trim().to_lowercase();
        if platform
            .allowed_content_types()
            .contains(&normalized.as_str())
        {
            Some(ContentType {
                platform,
                name: normalized,
            })
        } else {
            None
        }
    }
}
