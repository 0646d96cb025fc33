//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - External tool checks (yt-dlp, ffmpeg, ffprobe) logged at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;
use crate::core::process::tool_version;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the external tool setup at application startup
///
/// Missing tools are reported as errors but never abort startup: the bot can
/// still answer commands, downloads will fail with a generic message.
pub async fn log_tools_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🔧 External tools check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let tools = [
        ("yt-dlp", config::YTDL_BIN.as_str(), "--version"),
        ("ffmpeg", config::FFMPEG_BIN.as_str(), "-version"),
        ("ffprobe", config::FFPROBE_BIN.as_str(), "-version"),
    ];

    let mut all_found = true;
    for (name, bin, flag) in tools {
        match tool_version(bin, flag).await {
            Some(version) => log::info!("✅ {} ({}): {}", name, bin, version),
            None => {
                all_found = false;
                log::error!("❌ {} not found or not runnable: {}", name, bin);
            }
        }
    }

    log::info!("📁 Download folder: {}", config::DOWNLOAD_FOLDER.display());

    match config::CHANNEL_USERNAME.as_ref() {
        Some(channel) => log::info!("📢 Subscription gate: {}", channel),
        None => log::warn!("⚠️  CHANNEL_USERNAME not set - subscription gate disabled"),
    }

    if !all_found {
        log::error!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        log::error!("❌ Some tools are missing - downloads will FAIL!");
        log::error!("   Set YTDL_BIN / FFMPEG_BIN / FFPROBE_BIN or install them in PATH");
        log::error!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}
