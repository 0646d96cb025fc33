//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::commands::{handle_cancel_command, handle_start_command};
use super::messages::handle_text_message;
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::{is_message_addressed_to_bot, Command};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Order matters: commands first, then plain text, then callback queries.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

/// Handler for bot commands (/start, /help, /cancel)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
                match cmd {
                    Command::Start | Command::Help => handle_start_command(&bot, &msg, &deps).await?,
                    Command::Cancel => handle_cancel_command(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        },
    ))
}

/// Handler for text messages addressed to the bot
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let bot_username = deps.bot_username.clone();
    let bot_id = deps.bot_id;

    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .filter(move |msg: Message| is_message_addressed_to_bot(&msg, bot_username.as_deref(), bot_id))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_text_message(&bot, &msg, &deps).await {
                    log::error!("Message handler failed in chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for inline keyboard callbacks
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(&bot, &q, &deps).await }
    })
}
