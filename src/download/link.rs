//! Link recognition and short tokens
//!
//! Recognizes the two supported platforms:
//! - YouTube: `youtube.com/watch?v=ID`, `youtu.be/ID`, `/embed/ID`, `/v/ID`, `/shorts/ID`
//! - Instagram: `instagram.com/p/ID`, `/reel/ID`, `/reels/ID`
//!
//! Short tokens fit Telegram's 64-byte callback data limit.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use strum::Display;

/// YouTube links with an 11-character video id
static YOUTUBE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|v/|e/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("Failed to compile YouTube regex")
});

/// Instagram posts and reels
static INSTAGRAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?instagram\.com/(?:p|reel|reels)/([A-Za-z0-9_-]+)")
        .expect("Failed to compile Instagram regex")
});

/// Length of the hex token stored in callback data
pub const SHORT_TOKEN_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Platform {
    #[strum(serialize = "YouTube")]
    YouTube,
    #[strum(serialize = "Instagram")]
    Instagram,
}

/// A link the pipeline can download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLink {
    pub platform: Platform,
    /// The trimmed link as sent by the user; passed to yt-dlp unchanged
    pub url: String,
    /// Video id (YouTube) or post/reel shortcode (Instagram)
    pub media_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// Text does not start with `http://` or `https://`
    NotAUrl,
    /// An http(s) link to something other than YouTube/Instagram
    UnknownSite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    Supported(SupportedLink),
    Unsupported(UnsupportedReason),
}

impl LinkClass {
    pub fn supported(self) -> Option<SupportedLink> {
        match self {
            LinkClass::Supported(link) => Some(link),
            LinkClass::Unsupported(_) => None,
        }
    }
}

/// Classifies user text as a supported link or not.
pub fn classify(text: &str) -> LinkClass {
    let url = text.trim();

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return LinkClass::Unsupported(UnsupportedReason::NotAUrl);
    }

    let matchers = [
        (Platform::YouTube, &*YOUTUBE_REGEX),
        (Platform::Instagram, &*INSTAGRAM_REGEX),
    ];

    for (platform, regex) in matchers {
        if let Some(id) = regex.captures(url).and_then(|caps| caps.get(1)) {
            return LinkClass::Supported(SupportedLink {
                platform,
                url: url.to_string(),
                media_id: id.as_str().to_string(),
            });
        }
    }

    LinkClass::Unsupported(UnsupportedReason::UnknownSite)
}

/// Deterministic 8-hex-char token for a URL (truncated SHA-256).
///
/// Roughly 32 bits: collisions are possible and acceptable for a per-session
/// lookup table with a TTL, not for long-term storage.
pub fn short_token(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut token = hex::encode(digest);
    token.truncate(SHORT_TOKEN_LEN);
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn supported(text: &str) -> SupportedLink {
        classify(text).supported().unwrap()
    }

    #[test]
    fn test_youtube_short_and_watch_links_match() {
        let short = supported("https://youtu.be/dQw4w9WgXcQ");
        let watch = supported("https://www.youtube.com/watch?v=dQw4w9WgXcQ");

        assert_eq!(short.platform, Platform::YouTube);
        assert_eq!(watch.platform, Platform::YouTube);
        assert_eq!(short.media_id, "dQw4w9WgXcQ");
        assert_eq!(short.media_id, watch.media_id);
    }

    #[test]
    fn test_youtube_embed_v_and_shorts_forms() {
        for url in [
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ] {
            assert_eq!(supported(url).media_id, "dQw4w9WgXcQ", "{}", url);
        }
    }

    #[test]
    fn test_youtube_id_too_short() {
        assert_eq!(
            classify("https://youtu.be/abc"),
            LinkClass::Unsupported(UnsupportedReason::UnknownSite)
        );
    }

    #[test]
    fn test_instagram_reel_and_post() {
        let reel = supported("https://instagram.com/reel/Cabc123XYZ");
        assert_eq!(reel.platform, Platform::Instagram);
        assert_eq!(reel.media_id, "Cabc123XYZ");

        let post = supported("https://www.instagram.com/p/B-x_9yZ/");
        assert_eq!(post.media_id, "B-x_9yZ");

        assert!(classify("https://instagram.com/reels/Cabc123XYZ").supported().is_some());
    }

    #[test]
    fn test_instagram_profile_unsupported() {
        assert_eq!(
            classify("https://instagram.com/someone"),
            LinkClass::Unsupported(UnsupportedReason::UnknownSite)
        );
    }

    #[test]
    fn test_other_site_unsupported() {
        assert_eq!(
            classify("https://example.com/video"),
            LinkClass::Unsupported(UnsupportedReason::UnknownSite)
        );
    }

    #[test]
    fn test_non_url_text() {
        assert_eq!(classify("hello"), LinkClass::Unsupported(UnsupportedReason::NotAUrl));
        assert_eq!(
            classify("youtu.be/dQw4w9WgXcQ"),
            LinkClass::Unsupported(UnsupportedReason::NotAUrl)
        );
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let link = supported("  https://youtu.be/dQw4w9WgXcQ \n");
        assert_eq!(link.url, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_token_deterministic() {
        let url = "https://youtu.be/dQw4w9WgXcQ";
        let first = short_token(url);
        assert_eq!(first, short_token(url));
        assert_eq!(first.len(), SHORT_TOKEN_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_token_differs_per_url() {
        assert_ne!(
            short_token("https://youtu.be/dQw4w9WgXcQ"),
            short_token("https://instagram.com/reel/Cabc123XYZ")
        );
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::YouTube.to_string(), "YouTube");
        assert_eq!(Platform::Instagram.to_string(), "Instagram");
    }
}
