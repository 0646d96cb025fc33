use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use vidrelay::cli::{Cli, Commands};
use vidrelay::core::{config, init_logger, log_tools_configuration};
use vidrelay::download::{
    classify, DeliveryCoordinator, FfmpegTool, LinkClass, MediaFetcher, MediaProbe, MediaRequest, PipelineSettings,
    QualityTier, SizeEstimate, VideoSegmenter, YtDlpFetcher, YtDlpProbe,
};
use vidrelay::storage::{spawn_sweeper, SessionStore};
use vidrelay::telegram::{
    create_bot, schema, setup_bot_commands, ChannelSubscriptionGate, HandlerDeps, TelegramTransport,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Info { url }) => run_cli_info(url).await,
        Some(Commands::Download { url, quality, split }) => run_cli_download(url, quality, split).await,
    }
}

fn supported_link(url: &str) -> Result<vidrelay::download::SupportedLink> {
    match classify(url) {
        LinkClass::Supported(link) => Ok(link),
        LinkClass::Unsupported(reason) => Err(anyhow::anyhow!("Unsupported link ({:?}): {}", reason, url)),
    }
}

/// Prints the per-quality estimates the bot would offer for `url`
async fn run_cli_info(url: String) -> Result<()> {
    let link = supported_link(&url)?;
    let estimate = match YtDlpProbe::from_config().probe(&link).await {
        Ok(estimate) => estimate,
        Err(e) => {
            log::warn!("{}; showing default estimates", e);
            SizeEstimate::defaults()
        }
    };

    println!("🎬 {} {}", link.platform, link.media_id);
    for (quality, size) in estimate.iter() {
        let marker = if size < config::limits::MAX_OFFER_BYTES { "" } else { " (hidden)" };
        println!("  {:>5}: {:>8.1} MB{}", quality, size as f64 / (1024.0 * 1024.0), marker);
    }
    Ok(())
}

/// Downloads `url` into a fresh directory under the download folder
async fn run_cli_download(url: String, quality: QualityTier, split: bool) -> Result<()> {
    let link = supported_link(&url)?;
    let request = MediaRequest::new(link, quality);
    let work_dir = config::DOWNLOAD_FOLDER.join(request.id.to_string());
    let cancel = CancellationToken::new();

    let file = YtDlpFetcher::from_config().fetch(&request, &work_dir, &cancel).await?;
    println!("✅ Downloaded {}", file.display());

    if split {
        let segmenter = VideoSegmenter::new(Arc::new(FfmpegTool::from_config()));
        let parts = segmenter
            .segment(&file, config::limits::MAX_PART_BYTES, &cancel)
            .await?;
        for part in parts {
            println!("  part {}/{}: {}", part.index, part.total, part.path.display());
        }
    }
    Ok(())
}

/// Runs the bot with long polling until Ctrl+C
async fn run_bot() -> Result<()> {
    log::info!("Starting vidrelay bot...");
    log_tools_configuration().await;

    let bot = create_bot()?;

    let (bot_username, bot_id) = match bot.get_me().await {
        Ok(me) => (me.username.clone(), me.id),
        Err(e) => return Err(anyhow::anyhow!("Failed to fetch bot info: {}", e)),
    };
    log::info!("Bot username: {:?}, id: {}", bot_username, bot_id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let settings = PipelineSettings::from_config();
    tokio::fs::create_dir_all(&settings.download_dir).await?;

    let sessions = SessionStore::new(config::session::ttl());
    let _sweeper = spawn_sweeper(sessions.clone(), config::session::sweep_interval());

    let coordinator = Arc::new(DeliveryCoordinator::new(
        Arc::new(YtDlpProbe::from_config()),
        Arc::new(YtDlpFetcher::from_config()),
        VideoSegmenter::new(Arc::new(FfmpegTool::from_config())),
        Arc::new(TelegramTransport::new(bot.clone())),
        sessions,
        settings,
    ));
    let gate = Arc::new(ChannelSubscriptionGate::new(
        bot.clone(),
        config::CHANNEL_USERNAME.clone(),
    ));

    let deps = HandlerDeps::new(coordinator, gate, bot_username, bot_id);

    log::info!("Bot is running, press Ctrl+C to stop");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
