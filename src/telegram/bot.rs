//! Bot initialization and message routing utilities
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Message addressing logic (private chats, mentions, replies)

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatKind, Message, UserId};
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "I can do this:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "cancel the current download")]
    Cancel,
}

/// Creates a Bot instance with the configured token and an upload-friendly timeout
///
/// `BOT_API_URL` points the bot at a self-hosted Bot API server.
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    match std::env::var("BOT_API_URL") {
        Ok(api_url) if !api_url.trim().is_empty() => {
            log::info!("Using custom Bot API URL: {}", api_url);
            let url = url::Url::parse(api_url.trim()).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            Ok(bot.set_api_url(url))
        }
        _ => Ok(bot),
    }
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = Command::bot_commands();
    bot.set_my_commands(commands).await?;
    Ok(())
}

/// Whether a message is meant for the bot: private chats always, groups only
/// on replies to the bot or `@bot` mentions.
pub fn is_message_addressed_to_bot(msg: &Message, bot_username: Option<&str>, bot_id: UserId) -> bool {
    if matches!(msg.chat.kind, ChatKind::Private(_)) {
        return true;
    }

    let replies_to_bot = msg
        .reply_to_message()
        .and_then(|reply| reply.from.as_ref())
        .is_some_and(|from| from.id == bot_id);
    if replies_to_bot {
        return true;
    }

    match (msg.text(), bot_username) {
        (Some(text), Some(username)) => text
            .to_lowercase()
            .contains(&format!("@{}", username.to_lowercase())),
        _ => false,
    }
}

/// Strips `@bot` mentions so the remaining text can be classified as a link
pub fn strip_bot_mention(text: &str, bot_username: Option<&str>) -> String {
    match bot_username {
        Some(username) => text
            .split_whitespace()
            .filter(|word| !word.eq_ignore_ascii_case(&format!("@{}", username)))
            .collect::<Vec<_>>()
            .join(" "),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "vidrelay_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/cancel", "vidrelay_bot").unwrap(), Command::Cancel);
        assert!(Command::parse("/download", "vidrelay_bot").is_err());
    }

    #[test]
    fn test_command_descriptions() {
        let names: Vec<String> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command.trim_start_matches('/').to_string())
            .collect();
        assert_eq!(names, vec!["start", "help", "cancel"]);
    }

    #[test]
    fn test_strip_bot_mention() {
        assert_eq!(
            strip_bot_mention("@Vidrelay_Bot https://youtu.be/dQw4w9WgXcQ", Some("vidrelay_bot")),
            "https://youtu.be/dQw4w9WgXcQ"
        );
        assert_eq!(strip_bot_mention("  https://youtu.be/x ", None), "https://youtu.be/x");
    }
}
