use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError};
use crate::storage::session::SessionKey;
use crate::telegram::keyboard::subscription_keyboard;
use crate::telegram::subscription::SubscriptionGate;

const WELCOME: &str = "👋 Hi! Send me a video link and I will download it for you.\n\n\
     Supported links:\n\
     • YouTube: youtube.com/watch?v=... or youtu.be/...\n\
     • Instagram: instagram.com/p/... or instagram.com/reel/...\n\n\
     Videos over 50 MB are sent in parts. Use /cancel to stop a download.";

const NOTHING_TO_CANCEL: &str = "ℹ️ There is no download to cancel.";
const CANCELLING: &str = "🛑 Cancelling the current download...";

/// Asks the user to join the gate's channel. No-op when the gate is open.
pub(super) async fn send_subscription_prompt(
    bot: &Bot,
    chat: ChatId,
    gate: &dyn SubscriptionGate,
) -> Result<(), HandlerError> {
    let Some(channel) = gate.channel() else {
        return Ok(());
    };

    bot.send_message(
        chat,
        format!(
            "📢 To use the bot, subscribe to {} and then press \"I subscribed\".",
            channel
        ),
    )
    .reply_markup(subscription_keyboard(channel)?)
    .await?;
    Ok(())
}

/// `/start` and `/help`
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    if deps.gate.is_subscribed(user.id).await {
        bot.send_message(msg.chat.id, WELCOME).await?;
    } else {
        send_subscription_prompt(bot, msg.chat.id, deps.gate.as_ref()).await?;
    }
    Ok(())
}

/// `/cancel`: stops the user's in-flight download in this chat
pub(super) async fn handle_cancel_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let key = SessionKey::new(msg.chat.id, user.id);
    let text = if deps.coordinator.sessions().cancel(key).await {
        log::info!("User {} cancelled their download in chat {}", user.id, msg.chat.id);
        CANCELLING
    } else {
        NOTHING_TO_CANCEL
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
