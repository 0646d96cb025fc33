//! Bot API implementation of the pipeline's chat transport

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};

use crate::download::pipeline::{messages, ChatTransport, TransportError};
use crate::download::quality::QualityTier;
use crate::telegram::keyboard::quality_keyboard;

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn request_error(e: teloxide::RequestError) -> TransportError {
    TransportError::Request(e.to_string())
}

async fn input_file(path: &Path) -> Result<InputFile, TransportError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(TransportError::File(path.display().to_string()));
    }
    Ok(InputFile::file(path.to_path_buf()))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, TransportError> {
        let message = self.bot.send_message(chat, text).await.map_err(request_error)?;
        Ok(message.id)
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(chat, message, text)
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn show_quality_menu(
        &self,
        chat: ChatId,
        message: MessageId,
        token: &str,
        offers: &[(QualityTier, u64)],
    ) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(chat, message, messages::CHOOSE_QUALITY)
            .reply_markup(quality_keyboard(token, offers))
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn send_video(&self, chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError> {
        let file = input_file(path).await?;
        self.bot
            .send_video(chat, file)
            .caption(caption)
            .supports_streaming(true)
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn send_document(&self, chat: ChatId, path: &Path, caption: &str) -> Result<(), TransportError> {
        let file = input_file(path).await?;
        self.bot
            .send_document(chat, file)
            .caption(caption)
            .await
            .map_err(request_error)?;
        Ok(())
    }
}
