//! Video-id extraction from the URL shapes creators actually paste.

/// Extracts the video id from a `YouTube` URL.
///
/// Understands `watch?v=`, `youtu.be/`, `shorts/` and `embed/` forms; a bare
/// 11-character id is accepted as-is. Returns `None` for anything else.
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(rest) = url.split("watch?").nth(1) {
        for pair in rest.split('&') {
            if let Some(id) = pair.strip_prefix("v=") {
                return checked_id(id);
            }
        }
        return None;
    }

    for marker in ["youtu.be/", "/shorts/", "/embed/"] {
        if let Some(rest) = url.split(marker).nth(1) {
            let id = rest.split(['?', '&', '#', '/']).next().unwrap_or("");
            return checked_id(id);
        }
    }

    if !url.contains('/') && !url.contains('.') {
        return checked_id(url);
    }

    None
}

// Video ids are 11 URL-safe base64 characters.
fn checked_id(candidate: &str) -> Option<String> {
    let id = candidate.split(['?', '&', '#']).next().unwrap_or("");
    let valid = id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    valid.then(|| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn extracts_from_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?t=42&v=dQw4w9WgXcQ&list=PL1"),
            Some("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn extracts_from_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=xyz"),
            Some("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn extracts_from_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn accepts_bare_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn rejects_non_video_urls() {
        assert_eq!(extract_video_id("https://www.instagram.com/p/abc123/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/@somechannel"), None);
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=bad!length!"), None);
    }
}
