use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::send_subscription_prompt;
use super::types::{HandlerDeps, HandlerError};
use crate::core::error::AppError;
use crate::download::error::DownloadError;
use crate::telegram::bot::strip_bot_mention;

/// Text messages: gate check, then link handling in a background task so the
/// chat stays responsive while yt-dlp probes.
pub(super) async fn handle_text_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let chat = msg.chat.id;
    let user_id = user.id;

    if !deps.gate.is_subscribed(user_id).await {
        log::info!("User {} is not subscribed, sending prompt", user_id);
        return send_subscription_prompt(bot, chat, deps.gate.as_ref()).await;
    }

    let text = strip_bot_mention(text, deps.bot_username.as_deref());
    let coordinator = deps.coordinator.clone();
    tokio::spawn(async move {
        match coordinator.on_link_received(chat, user_id, &text).await {
            Ok(offer) => log::info!(
                "Offered {} qualities for token {} in chat {}",
                offer.offers.len(),
                offer.token,
                chat
            ),
            Err(AppError::Download(DownloadError::UnsupportedLink)) => {
                log::debug!("Ignored unsupported text from user {}", user_id)
            }
            Err(e) => log::error!("Link handling failed in chat {}: {}", chat, e),
        }
    });

    Ok(())
}
