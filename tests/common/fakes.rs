//! In-process stand-ins for yt-dlp, ffmpeg and the Bot API

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};
use tokio_util::sync::CancellationToken;

use vidrelay::download::segment::TimeRange;
use vidrelay::download::{
    ChatTransport, DownloadError, MediaFetcher, MediaProbe, MediaRequest, MediaTool, QualityTier, SizeEstimate,
    SupportedLink, TransportError,
};

pub struct FakeProbe {
    estimate: Option<SizeEstimate>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn returning(estimate: SizeEstimate) -> Self {
        Self {
            estimate: Some(estimate),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            estimate: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, _link: &SupportedLink) -> Result<SizeEstimate, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.estimate
            .ok_or_else(|| DownloadError::ProbeFailed("ERROR: [youtube] unavailable".into()))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FetchMode {
    /// Writes a sparse `video.mp4` of this many bytes
    Produce(u64),
    Fail,
    /// Waits for the cancellation token
    Hang,
}

pub struct FakeFetcher {
    mode: FetchMode,
    pub calls: AtomicUsize,
    pub produced: Mutex<Vec<PathBuf>>,
}

impl FakeFetcher {
    pub fn new(mode: FetchMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            produced: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _request: &MediaRequest,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(work_dir).map_err(|e| DownloadError::FetchFailed(e.to_string()))?;

        match self.mode {
            FetchMode::Produce(size) => {
                let path = work_dir.join("video.mp4");
                let file = std::fs::File::create(&path).map_err(|e| DownloadError::FetchFailed(e.to_string()))?;
                file.set_len(size).map_err(|e| DownloadError::FetchFailed(e.to_string()))?;
                self.produced.lock().unwrap().push(path.clone());
                Ok(path)
            }
            FetchMode::Fail => {
                // A leftover partial download must be cleaned up too
                std::fs::write(work_dir.join("video.mp4.part"), b"partial").ok();
                Err(DownloadError::FetchFailed("ERROR: Video unavailable".into()))
            }
            FetchMode::Hang => {
                cancel.cancelled().await;
                Err(DownloadError::Cancelled)
            }
        }
    }
}

/// Fake ffprobe/ffmpeg: fixed duration, every cut writes a small file
pub struct FakeTool {
    duration: f64,
    /// 1-based cut that fails instead of writing its part
    fail_on: Option<usize>,
    pub cuts: Mutex<Vec<TimeRange>>,
}

impl FakeTool {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            fail_on: None,
            cuts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(duration: f64, cut: usize) -> Self {
        Self {
            fail_on: Some(cut),
            ..Self::new(duration)
        }
    }

    pub fn ranges(&self) -> Vec<TimeRange> {
        self.cuts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTool for FakeTool {
    async fn duration(&self, _input: &Path, _cancel: &CancellationToken) -> Result<f64, DownloadError> {
        Ok(self.duration)
    }

    async fn cut(
        &self,
        _input: &Path,
        range: TimeRange,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let cut = {
            let mut cuts = self.cuts.lock().unwrap();
            cuts.push(range);
            cuts.len()
        };
        if self.fail_on == Some(cut) {
            return Err(DownloadError::SegmentFailed("ffmpeg exited with status 1".into()));
        }
        std::fs::write(output, b"part").map_err(|e| DownloadError::SegmentFailed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Text(String),
    Edit(MessageId, String),
    Menu {
        token: String,
        offers: Vec<(QualityTier, u64)>,
    },
    Video {
        path: PathBuf,
        caption: String,
        existed: bool,
    },
    Document {
        path: PathBuf,
        caption: String,
        existed: bool,
    },
}

/// Records every call; uploads can be made to fail
pub struct RecordingTransport {
    fail_uploads: bool,
    next_id: AtomicI32,
    events: Mutex<Vec<Event>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            fail_uploads: false,
            next_id: AtomicI32::new(100),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_edit(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Edit(_, text) => Some(text),
            _ => None,
        })
    }

    pub fn menus(&self) -> Vec<(String, Vec<(QualityTier, u64)>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Menu { token, offers } => Some((token, offers)),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Video { .. } | Event::Document { .. }))
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, _chat: ChatId, text: &str) -> Result<MessageId, TransportError> {
        self.record(Event::Text(text.to_string()));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn edit_text(&self, _chat: ChatId, message: MessageId, text: &str) -> Result<(), TransportError> {
        self.record(Event::Edit(message, text.to_string()));
        Ok(())
    }

    async fn show_quality_menu(
        &self,
        _chat: ChatId,
        _message: MessageId,
        token: &str,
        offers: &[(QualityTier, u64)],
    ) -> Result<(), TransportError> {
        self.record(Event::Menu {
            token: token.to_string(),
            offers: offers.to_vec(),
        });
        Ok(())
    }

    async fn send_video(&self, _chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError> {
        self.record(Event::Video {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
        });
        if self.fail_uploads {
            return Err(TransportError::Request("Request Entity Too Large".into()));
        }
        Ok(())
    }

    async fn send_document(&self, _chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError> {
        self.record(Event::Document {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
        });
        if self.fail_uploads {
            return Err(TransportError::Request("Request Entity Too Large".into()));
        }
        Ok(())
    }
}
