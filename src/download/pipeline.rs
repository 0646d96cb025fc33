//! Delivery coordinator: link → quality menu → fetch → (split) → send → cleanup
//!
//! The coordinator talks to the chat only through [`ChatTransport`] and to the
//! external tools only through the probe/fetch/segment seams, so the whole
//! flow runs in tests against fakes.
//!
//! Stages of one attempt:
//!   Idle → ProbeRequested → QualityChosen → Fetching → (Delivering | Splitting) → Done | Failed

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use strum::Display;
use teloxide::types::{ChatId, MessageId, UserId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::error::AppResult;
use crate::download::error::DownloadError;
use crate::download::fetch::MediaFetcher;
use crate::download::link::{classify, short_token, LinkClass, Platform, UnsupportedReason};
use crate::download::probe::MediaProbe;
use crate::download::quality::{MediaRequest, QualityTier, SizeEstimate};
use crate::download::segment::{VideoPart, VideoSegmenter};
use crate::storage::session::{SessionKey, SessionStore};

/// Chat-side failure reported by a [`ChatTransport`]
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("file not readable: {0}")]
    File(String),
}

/// Everything the coordinator needs to say to a chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, TransportError>;

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), TransportError>;

    /// Replaces `message` with the quality picker for `token`
    async fn show_quality_menu(
        &self,
        chat: ChatId,
        message: MessageId,
        token: &str,
        offers: &[(QualityTier, u64)],
    ) -> Result<(), TransportError>;

    /// Streaming-capable video attachment
    async fn send_video(&self, chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError>;

    async fn send_document(&self, chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError>;
}

pub mod messages {
    pub const INVALID_LINK: &str = "❌ Please send a valid link.";
    pub const FETCHING_INFO: &str = "🔍 Fetching video info...";
    pub const CHOOSE_QUALITY: &str = "🎬 Choose video quality:";
    pub const TOO_LARGE: &str = "❌ This video is too large for every available quality.";
    pub const DOWNLOADING: &str = "⏳ Downloading video... Please wait.";
    pub const SENDING: &str = "📤 Sending video...";
    pub const SPLITTING: &str = "📤 Splitting and sending in parts...";
    pub const SENT: &str = "✅ Video sent!";

    pub fn sent_in_parts(total: usize) -> String {
        format!("✅ Video sent in {} parts!", total)
    }
}

/// Caption attached to every delivered file
pub fn caption(quality: QualityTier, platform: Platform) -> String {
    format!("🎥 Quality: {}\n🔗 Source: {}", quality, platform)
}

/// Caption of one part of a split delivery
pub fn part_caption(quality: QualityTier, platform: Platform, part: &VideoPart) -> String {
    format!("{}\nPart {}/{}", caption(quality, platform), part.index, part.total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeliveryStage {
    Idle,
    ProbeRequested,
    QualityChosen,
    Fetching,
    Delivering,
    Splitting,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent of the per-request working directories
    pub download_dir: PathBuf,
    /// Files above this size are split
    pub split_threshold_bytes: u64,
    pub max_part_bytes: u64,
    /// Tiers estimated at or above this size get no button
    pub max_offer_bytes: u64,
}

impl PipelineSettings {
    pub fn from_config() -> Self {
        Self {
            download_dir: config::DOWNLOAD_FOLDER.clone(),
            split_threshold_bytes: config::limits::SPLIT_THRESHOLD_BYTES,
            max_part_bytes: config::limits::MAX_PART_BYTES,
            max_offer_bytes: config::limits::MAX_OFFER_BYTES,
        }
    }
}

/// What the user was offered for a link
#[derive(Debug, Clone)]
pub struct LinkOffer {
    pub token: String,
    pub status_message: MessageId,
    pub offers: Vec<(QualityTier, u64)>,
    /// True when probing failed and defaults were shown
    pub used_defaults: bool,
}

/// Outcome of a successful delivery
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub quality: QualityTier,
    pub size_bytes: u64,
    pub parts_sent: usize,
}

pub struct DeliveryCoordinator {
    probe: Arc<dyn MediaProbe>,
    fetcher: Arc<dyn MediaFetcher>,
    segmenter: VideoSegmenter,
    transport: Arc<dyn ChatTransport>,
    sessions: SessionStore,
    settings: PipelineSettings,
}

impl DeliveryCoordinator {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        fetcher: Arc<dyn MediaFetcher>,
        segmenter: VideoSegmenter,
        transport: Arc<dyn ChatTransport>,
        sessions: SessionStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            probe,
            fetcher,
            segmenter,
            transport,
            sessions,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles a text message: classify, probe, offer qualities, remember the token.
    ///
    /// Unsupported text is answered here and reported as `UnsupportedLink`.
    pub async fn on_link_received(&self, chat: ChatId, user: UserId, text: &str) -> AppResult<LinkOffer> {
        let link = match classify(text) {
            LinkClass::Supported(link) => link,
            LinkClass::Unsupported(reason) => {
                let reply = match reason {
                    UnsupportedReason::NotAUrl => messages::INVALID_LINK.to_string(),
                    UnsupportedReason::UnknownSite => DownloadError::UnsupportedLink.user_message(),
                };
                self.transport.send_text(chat, &reply).await?;
                return Err(DownloadError::UnsupportedLink.into());
            }
        };

        log::info!(
            "{} link {} from user {} in chat {}: {}",
            link.platform,
            link.media_id,
            user,
            chat,
            DeliveryStage::ProbeRequested
        );
        let status = self.transport.send_text(chat, messages::FETCHING_INFO).await?;

        let (estimate, used_defaults) = match self.probe.probe(&link).await {
            Ok(estimate) => (estimate, false),
            Err(e) => {
                log::warn!("Probe failed ({}), offering default sizes: {}", e.subcategory(), e);
                (SizeEstimate::defaults(), true)
            }
        };

        let offers = estimate.offers_below(self.settings.max_offer_bytes);
        let token = short_token(&link.url);
        self.sessions.remember(SessionKey::new(chat, user), &token, link).await;

        if offers.is_empty() {
            self.transport.edit_text(chat, status, messages::TOO_LARGE).await?;
        } else {
            self.transport.show_quality_menu(chat, status, &token, &offers).await?;
        }

        Ok(LinkOffer {
            token,
            status_message: status,
            offers,
            used_defaults,
        })
    }

    /// Handles a quality button press for `token`.
    ///
    /// An unknown or expired token fails with `LinkExpired` before anything is
    /// downloaded. Every other outcome is reported in `status` and the working
    /// directory is removed.
    pub async fn on_quality_chosen(
        &self,
        chat: ChatId,
        user: UserId,
        status: MessageId,
        token: &str,
        quality: QualityTier,
    ) -> Result<DeliveryReport, DownloadError> {
        let key = SessionKey::new(chat, user);
        let link = self.sessions.resolve(key, token).await.ok_or(DownloadError::LinkExpired)?;

        let request = MediaRequest::new(link, quality);
        log::info!("{}: {}", request, DeliveryStage::QualityChosen);

        let cancel = self.sessions.begin_download(key, request.id).await;
        let work_dir = self.settings.download_dir.join(request.id.to_string());

        let result = self.fetch_and_deliver(chat, status, &request, &work_dir, &cancel).await;

        remove_dir_logged(&work_dir).await;
        self.sessions.finish_download(key, request.id).await;

        match &result {
            Ok(report) => {
                log::info!("{}: {} ({} parts)", request, DeliveryStage::Done, report.parts_sent);
                let text = if report.parts_sent > 1 {
                    messages::sent_in_parts(report.parts_sent)
                } else {
                    messages::SENT.to_string()
                };
                self.update_status(chat, status, &text).await;
            }
            Err(e) => {
                log::error!("{}: {} [{}] {}", request, DeliveryStage::Failed, e.subcategory(), e);
                self.update_status(chat, status, &e.user_message()).await;
            }
        }

        result
    }

    async fn fetch_and_deliver(
        &self,
        chat: ChatId,
        status: MessageId,
        request: &MediaRequest,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReport, DownloadError> {
        log::info!("{}: {}", request, DeliveryStage::Fetching);
        self.update_status(chat, status, messages::DOWNLOADING).await;

        let file = self.fetcher.fetch(request, work_dir, cancel).await?;
        let size_bytes = tokio::fs::metadata(&file)
            .await
            .map_err(|e| DownloadError::FetchFailed(format!("cannot stat {}: {}", file.display(), e)))?
            .len();

        let parts_sent = if size_bytes > self.settings.split_threshold_bytes {
            log::info!("{}: {} ({} bytes)", request, DeliveryStage::Splitting, size_bytes);
            self.update_status(chat, status, messages::SPLITTING).await;
            self.deliver_parts(chat, request, &file, size_bytes, cancel).await?
        } else {
            log::info!("{}: {} ({} bytes)", request, DeliveryStage::Delivering, size_bytes);
            self.update_status(chat, status, messages::SENDING).await;

            let text = caption(request.quality, request.link.platform);
            self.transport
                .send_video(chat, &file, &text)
                .await
                .map_err(|e| DownloadError::DeliveryFailed {
                    size_bytes,
                    reason: e.to_string(),
                })?;
            remove_file_logged(&file).await;
            1
        };

        Ok(DeliveryReport {
            quality: request.quality,
            size_bytes,
            parts_sent,
        })
    }

    async fn deliver_parts(
        &self,
        chat: ChatId,
        request: &MediaRequest,
        file: &Path,
        size_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<usize, DownloadError> {
        let parts = self
            .segmenter
            .segment(file, self.settings.max_part_bytes, cancel)
            .await?;

        if parts.iter().all(|part| !part.is_whole_file()) {
            remove_file_logged(file).await;
        }

        for part in &parts {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let text = part_caption(request.quality, request.link.platform, part);
            self.transport
                .send_document(chat, &part.path, &text)
                .await
                .map_err(|e| DownloadError::DeliveryFailed {
                    size_bytes,
                    reason: format!("part {}/{}: {}", part.index, part.total, e),
                })?;

            log::info!("{}: sent part {}/{}", request, part.index, part.total);
            remove_file_logged(&part.path).await;
        }

        Ok(parts.len())
    }

    /// Progress edits are best effort
    async fn update_status(&self, chat: ChatId, status: MessageId, text: &str) {
        if let Err(e) = self.transport.edit_text(chat, status, text).await {
            log::warn!("Failed to update status message in chat {}: {}", chat, e);
        }
    }
}

async fn remove_file_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to delete {}: {}", path.display(), e);
        }
    }
}

async fn remove_dir_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to delete {}: {}", path.display(), e);
        }
    }
}
