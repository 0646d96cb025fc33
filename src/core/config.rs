use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Reads an environment variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    non_empty_var("BOT_TOKEN")
        .or_else(|| non_empty_var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Channel users must be subscribed to, e.g. `@mychannel`
/// Read from CHANNEL_USERNAME environment variable.
/// When unset the subscription gate lets everyone through.
pub static CHANNEL_USERNAME: Lazy<Option<String>> = Lazy::new(|| {
    non_empty_var("CHANNEL_USERNAME").map(|name| {
        if name.starts_with('@') {
            name
        } else {
            format!("@{}", name)
        }
    })
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| non_empty_var("YTDL_BIN").unwrap_or_else(|| "yt-dlp".to_string()));

/// ffmpeg binary, passed to yt-dlp for merging and used for cutting parts
pub static FFMPEG_BIN: Lazy<String> =
    Lazy::new(|| non_empty_var("FFMPEG_BIN").unwrap_or_else(|| "ffmpeg".to_string()));

/// ffprobe binary used to read media duration
pub static FFPROBE_BIN: Lazy<String> =
    Lazy::new(|| non_empty_var("FFPROBE_BIN").unwrap_or_else(|| "ffprobe".to_string()));

/// Download folder path
/// Read from DOWNLOAD_FOLDER environment variable, defaults to ./downloads
/// Supports tilde (~) expansion for home directory
pub static DOWNLOAD_FOLDER: Lazy<PathBuf> = Lazy::new(|| {
    let raw = non_empty_var("DOWNLOAD_FOLDER").unwrap_or_else(|| "downloads".to_string());
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: vidrelay.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("LOG_FILE_PATH").unwrap_or_else(|| "vidrelay.log".to_string()));

/// Size limits of the chat platform
pub mod limits {
    /// Files above this size are split before sending (50 MB bot upload limit)
    pub const SPLIT_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

    /// Target size of every part when splitting
    pub const MAX_PART_BYTES: u64 = 50 * 1024 * 1024;

    /// Quality buttons are only offered for estimates below this bound (2 GB)
    pub const MAX_OFFER_BYTES: u64 = 2 * 1024 * 1024 * 1024;
}

/// External tool timeouts
pub mod timeouts {
    use super::Duration;

    /// yt-dlp metadata dump
    pub const PROBE_SECS: u64 = 120;

    /// yt-dlp download + merge
    pub const FETCH_SECS: u64 = 600;

    /// ffprobe duration query
    pub const FFPROBE_SECS: u64 = 30;

    /// One ffmpeg stream-copy cut
    pub const SEGMENT_CUT_SECS: u64 = 120;

    pub fn probe() -> Duration {
        Duration::from_secs(PROBE_SECS)
    }

    pub fn fetch() -> Duration {
        Duration::from_secs(FETCH_SECS)
    }

    pub fn ffprobe() -> Duration {
        Duration::from_secs(FFPROBE_SECS)
    }

    pub fn segment_cut() -> Duration {
        Duration::from_secs(SEGMENT_CUT_SECS)
    }
}

/// Pending-link session configuration
pub mod session {
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// How long a quality keyboard stays usable
    pub const DEFAULT_TTL_MINUTES: u64 = 60;

    /// Interval of the background sweep removing expired links
    pub const SWEEP_INTERVAL_SECS: u64 = 600;

    /// TTL in minutes, read from SESSION_TTL_MINUTES
    pub static TTL_MINUTES: Lazy<u64> = Lazy::new(|| {
        super::non_empty_var("SESSION_TTL_MINUTES")
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TTL_MINUTES)
    });

    pub fn ttl() -> Duration {
        Duration::from_secs(*TTL_MINUTES * 60)
    }

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Extractor request shaping
pub mod extractor {
    /// Header value yt-dlp sends for Instagram so it is served as the mobile app
    pub const INSTAGRAM_USER_AGENT: &str = "User-Agent:Instagram 219.0.0.12.117 Android";
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Long enough for 50 MB uploads on slow links
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_ordered() {
        assert!(limits::MAX_PART_BYTES <= limits::SPLIT_THRESHOLD_BYTES);
        assert!(limits::SPLIT_THRESHOLD_BYTES < limits::MAX_OFFER_BYTES);
    }

    #[test]
    fn test_timeout_helpers() {
        assert_eq!(timeouts::probe(), Duration::from_secs(120));
        assert_eq!(timeouts::fetch(), Duration::from_secs(600));
    }
}
