//! Quality-specific downloads through yt-dlp
//!
//! Every request downloads into its own working directory with an explicit
//! output template, and yt-dlp prints the final path after merging
//! (`--print after_move:filepath`), so concurrent downloads never have to guess
//! which file is theirs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::link::Platform;
use crate::download::quality::MediaRequest;

/// File name stem of every fetch output inside a working directory
const OUTPUT_STEM: &str = "video";

/// Container every download is merged into
pub const MERGE_FORMAT: &str = "mp4";

/// Download seam used by the coordinator.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Downloads `request` into `work_dir` and returns the produced file.
    async fn fetch(
        &self,
        request: &MediaRequest,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError>;
}

/// yt-dlp + ffmpeg backed fetcher
pub struct YtDlpFetcher {
    ytdl_bin: String,
    ffmpeg_bin: String,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(ytdl_bin: impl Into<String>, ffmpeg_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ytdl_bin: ytdl_bin.into(),
            ffmpeg_bin: ffmpeg_bin.into(),
            timeout,
        }
    }

    /// Fetcher configured from the environment
    pub fn from_config() -> Self {
        Self::new(
            config::YTDL_BIN.as_str(),
            config::FFMPEG_BIN.as_str(),
            config::timeouts::fetch(),
        )
    }

    /// Output template `<work_dir>/video.%(ext)s`
    pub fn output_template(work_dir: &Path) -> String {
        work_dir
            .join(format!("{}.%(ext)s", OUTPUT_STEM))
            .to_string_lossy()
            .into_owned()
    }

    fn build_args(&self, request: &MediaRequest, work_dir: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            request.quality.format_selector(),
            "--no-warnings".into(),
            "--no-check-certificate".into(),
            "--ffmpeg-location".into(),
            self.ffmpeg_bin.clone(),
            "--merge-output-format".into(),
            MERGE_FORMAT.into(),
            "-o".into(),
            Self::output_template(work_dir),
            "--print".into(),
            "after_move:filepath".into(),
            "--no-simulate".into(),
        ];

        match request.link.platform {
            Platform::Instagram => {
                args.push("--add-header".into());
                args.push(config::extractor::INSTAGRAM_USER_AGENT.into());
            }
            Platform::YouTube => args.push("--no-playlist".into()),
        }

        args.push(request.link.url.clone());
        args
    }
}

/// Picks the downloaded file: the path yt-dlp printed, or else the only
/// finished media file in the (request-private) working directory.
async fn resolve_output(stdout: &str, work_dir: &Path) -> Result<PathBuf, DownloadError> {
    if let Some(line) = stdout.lines().rev().map(str::trim).find(|line| !line.is_empty()) {
        let printed = PathBuf::from(line);
        if tokio::fs::try_exists(&printed).await.unwrap_or(false) {
            return Ok(printed);
        }
        log::warn!("yt-dlp printed {} but it does not exist", printed.display());
    }

    let mut entries = tokio::fs::read_dir(work_dir)
        .await
        .map_err(|e| DownloadError::FetchFailed(format!("cannot read {}: {}", work_dir.display(), e)))?;

    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && name.starts_with(OUTPUT_STEM) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(DownloadError::FetchFailed("yt-dlp produced no output file".to_string())),
        n => Err(DownloadError::FetchFailed(format!(
            "yt-dlp left {} candidate files in {}",
            n,
            work_dir.display()
        ))),
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        request: &MediaRequest,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| DownloadError::FetchFailed(format!("cannot create {}: {}", work_dir.display(), e)))?;

        let args = self.build_args(request, work_dir);
        log::info!("Fetching {}", request);
        log::debug!("yt-dlp command: {} {}", self.ytdl_bin, args.join(" "));

        let output = run_with_timeout(
            Command::new(&self.ytdl_bin).args(&args),
            self.timeout,
            Some(cancel),
        )
        .await
        .map_err(DownloadError::fetch)?;

        if !output.status.success() {
            let tail = stderr_tail(&output, 10);
            log::error!("yt-dlp failed for {} ({}):\n{}", request, output.status, tail);
            return Err(DownloadError::FetchFailed(format!("exit {}: {}", output.status, tail)));
        }

        let path = resolve_output(&String::from_utf8_lossy(&output.stdout), work_dir).await?;
        log::info!("Fetched {} -> {}", request, path.display());
        Ok(path)
    }
}
