//! Per-quality size estimation from yt-dlp metadata
//!
//! Runs `yt-dlp --dump-json` (no download) and picks, for every numeric tier,
//! the encoding with exactly that height. Missing data falls back to the fixed
//! defaults, so a probe only fails on tool errors or unreadable JSON.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::core::config;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::link::{Platform, SupportedLink};
use crate::download::quality::{QualityTier, SizeEstimate};

/// Size estimation seam used by the coordinator.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, link: &SupportedLink) -> Result<SizeEstimate, DownloadError>;
}

#[derive(Debug, Deserialize)]
struct ProbeInfo {
    #[serde(default)]
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    height: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    acodec: Option<String>,
}

impl FormatEntry {
    fn size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx)
            .filter(|size| *size > 0.0)
            .map(|size| size as u64)
    }

    fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }

    fn height(&self) -> Option<u32> {
        self.height.map(|h| h as u32)
    }
}

/// Size of the encoding at exactly `height`, preferring one that carries audio.
fn size_at_height(formats: &[FormatEntry], height: u32) -> Option<u64> {
    let matching: Vec<&FormatEntry> = formats.iter().filter(|f| f.height() == Some(height)).collect();
    let chosen = matching
        .iter()
        .find(|f| f.has_audio())
        .or_else(|| matching.first())?;
    chosen.size()
}

/// Builds a repaired `SizeEstimate` from a `--dump-json` document.
///
/// Only the first JSON value is read; yt-dlp prints one object per entry.
pub fn estimate_from_json(json: &str) -> Result<SizeEstimate, DownloadError> {
    let info: ProbeInfo = serde_json::Deserializer::from_str(json)
        .into_iter::<ProbeInfo>()
        .next()
        .ok_or_else(|| DownloadError::ProbeFailed("empty metadata output".to_string()))?
        .map_err(|e| DownloadError::ProbeFailed(format!("malformed metadata: {}", e)))?;

    let raw = QualityTier::ALL.map(|tier| match tier.height() {
        Some(height) => size_at_height(&info.formats, height).unwrap_or_else(|| tier.default_estimate()),
        None => info
            .formats
            .iter()
            .filter_map(FormatEntry::size)
            .max()
            .unwrap_or_else(|| tier.default_estimate()),
    });

    Ok(SizeEstimate::from_raw(raw))
}

/// yt-dlp backed probe
pub struct YtDlpProbe {
    ytdl_bin: String,
    timeout: Duration,
}

impl YtDlpProbe {
    pub fn new(ytdl_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ytdl_bin: ytdl_bin.into(),
            timeout,
        }
    }

    /// Probe configured from the environment
    pub fn from_config() -> Self {
        Self::new(config::YTDL_BIN.as_str(), config::timeouts::probe())
    }

    fn build_args(link: &SupportedLink) -> Vec<&str> {
        let mut args = vec!["--no-warnings", "--no-check-certificate", "--dump-json"];
        match link.platform {
            Platform::Instagram => {
                args.push("--add-header");
                args.push(config::extractor::INSTAGRAM_USER_AGENT);
            }
            Platform::YouTube => args.push("--no-playlist"),
        }
        args.push(link.url.as_str());
        args
    }
}

#[async_trait]
impl MediaProbe for YtDlpProbe {
    async fn probe(&self, link: &SupportedLink) -> Result<SizeEstimate, DownloadError> {
        let args = Self::build_args(link);
        log::debug!("yt-dlp probe command: {} {}", self.ytdl_bin, args.join(" "));

        let output = run_with_timeout(Command::new(&self.ytdl_bin).args(&args), self.timeout, None)
            .await
            .map_err(|e| DownloadError::ProbeFailed(e.to_string()))?;

        if !output.status.success() {
            let tail = stderr_tail(&output, 5);
            log::warn!("yt-dlp probe failed for {} ({}): {}", link.url, output.status, tail);
            return Err(DownloadError::ProbeFailed(format!("exit {}: {}", output.status, tail)));
        }

        let estimate = estimate_from_json(&String::from_utf8_lossy(&output.stdout))?;
        log::info!("Probed {} {}: {:?}", link.platform, link.media_id, estimate);
        Ok(estimate)
    }
}
