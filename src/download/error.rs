use thiserror::Error;

use crate::core::process::ToolError;

/// Error kinds crossing the pipeline's component boundaries.
///
/// Callers branch on the variant; the inner strings carry tool diagnostics for
/// logs only and are never shown to users (see `user_message`).
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Text is not a supported YouTube/Instagram link
    #[error("unsupported link")]
    UnsupportedLink,

    /// Metadata dump failed or was malformed. Never fatal: callers fall back to defaults.
    #[error("probe failed: {0}")]
    ProbeFailed(String),

    /// yt-dlp did not produce a usable file
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Short token is unknown or its session entry expired
    #[error("link expired")]
    LinkExpired,

    /// ffprobe/ffmpeg failed while cutting parts
    #[error("segmentation failed: {0}")]
    SegmentFailed(String),

    /// Sending to the chat failed after a successful fetch
    #[error("delivery failed ({size_bytes} bytes): {reason}")]
    DeliveryFailed { size_bytes: u64, reason: String },

    /// The user cancelled the in-flight download
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::UnsupportedLink => "unsupported_link",
            DownloadError::ProbeFailed(_) => "probe_failed",
            DownloadError::FetchFailed(_) => "fetch_failed",
            DownloadError::LinkExpired => "link_expired",
            DownloadError::SegmentFailed(_) => "segment_failed",
            DownloadError::DeliveryFailed { .. } => "delivery_failed",
            DownloadError::Cancelled => "cancelled",
        }
    }

    /// One message per category, safe to show in chat.
    pub fn user_message(&self) -> String {
        match self {
            DownloadError::UnsupportedLink => "❌ Unsupported link!\n\n\
                 Supported formats:\n\
                 • YouTube: youtube.com/watch?v=... or youtu.be/...\n\
                 • Instagram: instagram.com/p/... or instagram.com/reel/..."
                .to_string(),
            DownloadError::ProbeFailed(_) => "❌ Could not read video info. Please try again later.".to_string(),
            DownloadError::FetchFailed(_) => "❌ Failed to download the video. Possible reasons:\n\
                 • The video is unavailable\n\
                 • The video is protected\n\
                 • Download error\n\n\
                 Try another quality or another video."
                .to_string(),
            DownloadError::LinkExpired => "❌ Link expired. Please send it again.".to_string(),
            DownloadError::SegmentFailed(_) => "❌ Failed to split the video into parts.\n\
                 Try a lower quality."
                .to_string(),
            DownloadError::DeliveryFailed { size_bytes, .. } => format!(
                "❌ Failed to send the video. File size: {:.1} MB\n\
                 Try a lower quality or another video.",
                *size_bytes as f64 / (1024.0 * 1024.0)
            ),
            DownloadError::Cancelled => "🛑 Download cancelled.".to_string(),
        }
    }

    /// Maps a tool failure during fetch, keeping cancellation distinct.
    pub fn fetch(err: ToolError) -> Self {
        match err {
            ToolError::Cancelled { .. } => DownloadError::Cancelled,
            other => DownloadError::FetchFailed(other.to_string()),
        }
    }

    /// Maps a tool failure during segmentation, keeping cancellation distinct.
    pub fn segment(err: ToolError) -> Self {
        match err {
            ToolError::Cancelled { .. } => DownloadError::Cancelled,
            other => DownloadError::SegmentFailed(other.to_string()),
        }
    }
}
