use teloxide::prelude::*;

use super::commands::send_subscription_prompt;
use super::types::{HandlerDeps, HandlerError};
use crate::download::error::DownloadError;
use crate::storage::session::SessionKey;
use crate::telegram::keyboard::CallbackAction;

const LINK_EXPIRED_ALERT: &str = "❌ Link expired, send it again.";
const SUBSCRIBE_FIRST_ALERT: &str = "❌ Please subscribe to the channel first.";
const SUBSCRIBED_ALERT: &str = "✅ Subscription confirmed!";
const SEND_LINK_PROMPT: &str = "🎉 Now send me a YouTube or Instagram link.";

pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::warn!("Unknown callback data {:?} from user {}", q.data, q.from.id);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat = message.chat().id;
    let user = q.from.id;

    if !deps.gate.is_subscribed(user).await {
        bot.answer_callback_query(q.id.clone())
            .text(SUBSCRIBE_FIRST_ALERT)
            .show_alert(true)
            .await?;
        if matches!(action, CallbackAction::Download { .. }) {
            send_subscription_prompt(bot, chat, deps.gate.as_ref()).await?;
        }
        return Ok(());
    }

    match action {
        CallbackAction::CheckSubscription => {
            bot.answer_callback_query(q.id.clone())
                .text(SUBSCRIBED_ALERT)
                .show_alert(true)
                .await?;
            bot.send_message(chat, SEND_LINK_PROMPT).await?;
        }
        CallbackAction::Download { token, quality } => {
            let key = SessionKey::new(chat, user);
            if deps.coordinator.sessions().resolve(key, &token).await.is_none() {
                log::info!("Expired token {} from user {}", token, user);
                bot.answer_callback_query(q.id.clone())
                    .text(LINK_EXPIRED_ALERT)
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            bot.answer_callback_query(q.id.clone()).text("⏳ Processing...").await?;

            // Downloads run detached so /cancel from the same chat is handled meanwhile
            let status = message.id();
            let coordinator = deps.coordinator.clone();
            let bot = bot.clone();
            tokio::spawn(async move {
                if let Err(DownloadError::LinkExpired) =
                    coordinator.on_quality_chosen(chat, user, status, &token, quality).await
                {
                    if let Err(e) = bot
                        .edit_message_text(chat, status, DownloadError::LinkExpired.user_message())
                        .await
                    {
                        log::warn!("Failed to update status message in chat {}: {}", chat, e);
                    }
                }
            });
        }
    }

    Ok(())
}
