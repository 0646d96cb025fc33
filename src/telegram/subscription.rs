//! Channel membership gate checked before any link is processed

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{Recipient, UserId};

/// `is_subscribed(user)` as the handlers need it.
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn is_subscribed(&self, user: UserId) -> bool;

    /// Channel users are asked to join, `None` when the gate is open
    fn channel(&self) -> Option<&str>;
}

/// Checks membership in a public channel through `getChatMember`.
///
/// The bot must be an administrator of the channel for the call to succeed.
/// API errors count as "not subscribed".
pub struct ChannelSubscriptionGate {
    bot: Bot,
    channel: Option<String>,
}

impl ChannelSubscriptionGate {
    pub fn new(bot: Bot, channel: Option<String>) -> Self {
        Self { bot, channel }
    }
}

#[async_trait]
impl SubscriptionGate for ChannelSubscriptionGate {
    async fn is_subscribed(&self, user: UserId) -> bool {
        let Some(channel) = self.channel.as_ref() else {
            return true;
        };

        match self
            .bot
            .get_chat_member(Recipient::ChannelUsername(channel.clone()), user)
            .await
        {
            Ok(member) => member.kind.is_present(),
            Err(e) => {
                log::warn!("Subscription check for user {} in {} failed: {}", user, channel, e);
                false
            }
        }
    }

    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }
}
