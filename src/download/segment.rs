//! Time-based splitting of oversized videos
//!
//! A file above the part limit is cut into `ceil(size / limit)` slices of equal
//! duration with stream copy (no re-encoding). Equal time slicing is not equal
//! byte slicing: a variable-bitrate part can still exceed the limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;

/// Directory (next to the source) that receives the cut parts
pub const PARTS_DIR: &str = "parts";

/// `[start, start + duration)` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// One file of an ordered delivery sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPart {
    /// 1-based position
    pub index: usize,
    pub total: usize,
    pub path: PathBuf,
    /// `None` when the part is the untouched source file
    pub range: Option<TimeRange>,
}

impl VideoPart {
    pub fn is_whole_file(&self) -> bool {
        self.range.is_none()
    }
}

/// Computes the time slices for a file of `size_bytes` lasting `duration_secs`.
///
/// Returns a single full-length range when the file already fits. The last
/// range always ends exactly at `duration_secs`.
pub fn plan_segments(size_bytes: u64, duration_secs: f64, max_part_bytes: u64) -> Vec<TimeRange> {
    let max_part_bytes = max_part_bytes.max(1);
    let count = size_bytes.div_ceil(max_part_bytes).max(1);
    let slice = duration_secs / count as f64;

    (0..count)
        .map(|i| {
            let start = i as f64 * slice;
            let end = if i + 1 == count {
                duration_secs
            } else {
                ((i + 1) as f64 * slice).min(duration_secs)
            };
            TimeRange {
                start,
                duration: end - start,
            }
        })
        .collect()
}

/// The transcoding tool as the segmenter needs it.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Container duration in seconds
    async fn duration(&self, input: &Path, cancel: &CancellationToken) -> Result<f64, DownloadError>;

    /// Stream-copies `range` of `input` into `output`
    async fn cut(
        &self,
        input: &Path,
        range: TimeRange,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

/// ffprobe + ffmpeg implementation of [`MediaTool`]
pub struct FfmpegTool {
    ffmpeg_bin: String,
    ffprobe_bin: String,
    probe_timeout: Duration,
    cut_timeout: Duration,
}

impl FfmpegTool {
    pub fn new(
        ffmpeg_bin: impl Into<String>,
        ffprobe_bin: impl Into<String>,
        probe_timeout: Duration,
        cut_timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
            probe_timeout,
            cut_timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            config::FFMPEG_BIN.as_str(),
            config::FFPROBE_BIN.as_str(),
            config::timeouts::ffprobe(),
            config::timeouts::segment_cut(),
        )
    }

    fn cut_args(input: &Path, range: TimeRange, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-ss".into(),
            format!("{:.3}", range.start),
            "-t".into(),
            format!("{:.3}", range.duration),
            "-c".into(),
            "copy".into(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn duration(&self, input: &Path, cancel: &CancellationToken) -> Result<f64, DownloadError> {
        let output = run_with_timeout(
            Command::new(&self.ffprobe_bin)
                .args([
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ])
                .arg(input),
            self.probe_timeout,
            Some(cancel),
        )
        .await
        .map_err(DownloadError::segment)?;

        if !output.status.success() {
            return Err(DownloadError::SegmentFailed(format!(
                "ffprobe exit {}: {}",
                output.status,
                stderr_tail(&output, 5)
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|_| DownloadError::SegmentFailed(format!("unreadable duration {:?}", text.trim())))
    }

    async fn cut(
        &self,
        input: &Path,
        range: TimeRange,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let args = Self::cut_args(input, range, output);
        log::debug!("ffmpeg command: {} {}", self.ffmpeg_bin, args.join(" "));

        let result = run_with_timeout(Command::new(&self.ffmpeg_bin).args(&args), self.cut_timeout, Some(cancel))
            .await
            .map_err(DownloadError::segment)?;

        if !result.status.success() {
            return Err(DownloadError::SegmentFailed(format!(
                "ffmpeg exit {}: {}",
                result.status,
                stderr_tail(&result, 5)
            )));
        }
        Ok(())
    }
}

/// Splits a fetched file into deliverable parts.
pub struct VideoSegmenter {
    tool: Arc<dyn MediaTool>,
}

impl VideoSegmenter {
    pub fn new(tool: Arc<dyn MediaTool>) -> Self {
        Self { tool }
    }

    /// Returns the ordered parts of `source`.
    ///
    /// A source within `max_part_bytes` comes back as one whole-file part without
    /// touching the tool. Otherwise parts are written to `<source dir>/parts/`;
    /// any failed cut aborts the whole split. Removing the parts directory is
    /// left to the caller.
    pub async fn segment(
        &self,
        source: &Path,
        max_part_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoPart>, DownloadError> {
        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| DownloadError::SegmentFailed(format!("cannot stat {}: {}", source.display(), e)))?
            .len();

        if size <= max_part_bytes {
            log::info!("{} ({} bytes) fits in one part", source.display(), size);
            return Ok(vec![VideoPart {
                index: 1,
                total: 1,
                path: source.to_path_buf(),
                range: None,
            }]);
        }

        let duration = self.tool.duration(source, cancel).await?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DownloadError::SegmentFailed(format!("invalid duration {}", duration)));
        }

        let plan = plan_segments(size, duration, max_part_bytes);
        let total = plan.len();
        log::info!(
            "Splitting {} ({} MB, {:.1}s) into {} parts of ~{:.1}s",
            source.display(),
            size / (1024 * 1024),
            duration,
            total,
            duration / total as f64
        );

        let parts_dir = source.parent().unwrap_or_else(|| Path::new(".")).join(PARTS_DIR);
        tokio::fs::create_dir_all(&parts_dir)
            .await
            .map_err(|e| DownloadError::SegmentFailed(format!("cannot create {}: {}", parts_dir.display(), e)))?;

        let mut parts = Vec::with_capacity(total);
        for (i, range) in plan.into_iter().enumerate() {
            let index = i + 1;
            let path = parts_dir.join(format!("part_{:03}.mp4", index));
            self.tool.cut(source, range, &path, cancel).await?;

            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(DownloadError::SegmentFailed(format!("part {} was not written", index)));
            }
            parts.push(VideoPart {
                index,
                total,
                path,
                range: Some(range),
            });
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MB: u64 = 1024 * 1024;

    struct CountingTool {
        duration: f64,
        cuts: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingTool {
        fn new(duration: f64) -> Self {
            Self {
                duration,
                cuts: AtomicUsize::new(0),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl MediaTool for CountingTool {
        async fn duration(&self, _input: &Path, _cancel: &CancellationToken) -> Result<f64, DownloadError> {
            Ok(self.duration)
        }

        async fn cut(
            &self,
            _input: &Path,
            _range: TimeRange,
            output: &Path,
            _cancel: &CancellationToken,
        ) -> Result<(), DownloadError> {
            let n = self.cuts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                return Err(DownloadError::SegmentFailed("boom".into()));
            }
            std::fs::write(output, b"part").map_err(|e| DownloadError::SegmentFailed(e.to_string()))
        }
    }

    fn sparse_file(dir: &Path, size: u64) -> PathBuf {
        let path = dir.join("video.mp4");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(size).unwrap();
        path
    }

    #[test]
    fn test_plan_150mb_into_three_contiguous_parts() {
        let plan = plan_segments(150 * MB, 300.0, 50 * MB);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].start, 0.0);
        for pair in plan.windows(2) {
            assert!((pair[0].end() - pair[1].start).abs() < 1e-9);
        }
        let total: f64 = plan.iter().map(|r| r.duration).sum();
        assert!((total - 300.0).abs() < 1e-9);
        assert_eq!(plan[2].end(), 300.0);
    }

    #[test]
    fn test_plan_rounds_part_count_up() {
        assert_eq!(plan_segments(50 * MB + 1, 10.0, 50 * MB).len(), 2);
        assert_eq!(plan_segments(60 * MB, 10.0, 50 * MB).len(), 2);
        assert_eq!(plan_segments(10 * MB, 10.0, 50 * MB).len(), 1);
    }

    #[test]
    fn test_cut_args_use_stream_copy() {
        let args = FfmpegTool::cut_args(
            Path::new("in.mp4"),
            TimeRange {
                start: 12.5,
                duration: 30.0,
            },
            Path::new("out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-i in.mp4 -ss 12.500 -t 30.000 -c copy out.mp4"));
    }

    #[tokio::test]
    async fn test_small_file_is_returned_whole() {
        let dir = tempfile::tempdir().unwrap();
        let source = sparse_file(dir.path(), 40 * MB);
        let tool = Arc::new(CountingTool::new(100.0));
        let segmenter = VideoSegmenter::new(tool.clone());

        let parts = segmenter
            .segment(&source, 50 * MB, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].path, source);
        assert!(parts[0].is_whole_file());
        assert_eq!(tool.cuts.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join(PARTS_DIR).exists());
    }

    #[tokio::test]
    async fn test_large_file_is_cut_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = sparse_file(dir.path(), 150 * MB);
        let tool = Arc::new(CountingTool::new(90.0));
        let segmenter = VideoSegmenter::new(tool.clone());

        let parts = segmenter
            .segment(&source, 50 * MB, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(tool.cuts.load(Ordering::SeqCst), 3);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.index, i + 1);
            assert_eq!(part.total, 3);
            assert!(part.path.exists());
            assert_eq!(
                part.path.file_name().unwrap().to_string_lossy(),
                format!("part_{:03}.mp4", i + 1)
            );
        }
        let ranges: Vec<TimeRange> = parts.iter().filter_map(|p| p.range).collect();
        assert_eq!(ranges[0].start, 0.0);
        assert_eq!(ranges[2].end(), 90.0);
    }

    #[tokio::test]
    async fn test_failed_cut_aborts_split() {
        let dir = tempfile::tempdir().unwrap();
        let source = sparse_file(dir.path(), 150 * MB);
        let tool = Arc::new(CountingTool {
            fail_on: Some(2),
            ..CountingTool::new(90.0)
        });
        let segmenter = VideoSegmenter::new(tool.clone());

        let result = segmenter.segment(&source, 50 * MB, &CancellationToken::new()).await;
        assert!(matches!(result, Err(DownloadError::SegmentFailed(_))));
        assert_eq!(tool.cuts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = sparse_file(dir.path(), 150 * MB);
        let segmenter = VideoSegmenter::new(Arc::new(CountingTool::new(0.0)));
        let result = segmenter.segment(&source, 50 * MB, &CancellationToken::new()).await;
        assert!(matches!(result, Err(DownloadError::SegmentFailed(_))));
    }
}
