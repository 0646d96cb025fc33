//! vidrelay - Telegram bot that downloads YouTube and Instagram videos
//!
//! A link gets a quality picker with size estimates; the chosen quality is
//! fetched with yt-dlp, split into time-based parts when it exceeds the 50 MB
//! upload limit, delivered in order and cleaned up.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and external process helpers
//! - `download`: Link recognition, probing, fetching, splitting and the delivery coordinator
//! - `storage`: In-memory per-chat sessions
//! - `telegram`: Bot creation, keyboards and the dispatcher handler tree
//! - `cli`: Command line interface

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::download::{DeliveryCoordinator, DownloadError, PipelineSettings, QualityTier};
pub use crate::storage::SessionStore;
