//! Inline keyboards and the callback data they carry
//!
//! Callback data formats:
//! - `download_<token>_<tier>`: quality button, token from `short_token`
//! - `check_subscription`: "I subscribed" button

use std::str::FromStr;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::download::quality::QualityTier;

const DOWNLOAD_PREFIX: &str = "download_";
const CHECK_SUBSCRIPTION: &str = "check_subscription";
const BUTTONS_PER_ROW: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Download { token: String, quality: QualityTier },
    CheckSubscription,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == CHECK_SUBSCRIPTION {
            return Some(CallbackAction::CheckSubscription);
        }

        let rest = data.strip_prefix(DOWNLOAD_PREFIX)?;
        let (token, tier) = rest.rsplit_once('_')?;
        if token.is_empty() {
            return None;
        }
        let quality = QualityTier::from_str(tier).ok()?;
        Some(CallbackAction::Download {
            token: token.to_string(),
            quality,
        })
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Download { token, quality } => format!("{}{}_{}", DOWNLOAD_PREFIX, token, quality),
            CallbackAction::CheckSubscription => CHECK_SUBSCRIPTION.to_string(),
        }
    }
}

/// Button text: `📱 720p (48.2MB)`, or `🎥 Max (...)` for the best tier
pub fn quality_label(quality: QualityTier, size_bytes: u64) -> String {
    let mb = size_bytes as f64 / (1024.0 * 1024.0);
    match quality {
        QualityTier::Best => format!("🎥 Max ({:.1}MB)", mb),
        tier => format!("📱 {} ({:.1}MB)", tier, mb),
    }
}

/// One button per offered tier, two per row
pub fn quality_keyboard(token: &str, offers: &[(QualityTier, u64)]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = offers
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|(quality, size)| {
                    let action = CallbackAction::Download {
                        token: token.to_string(),
                        quality: *quality,
                    };
                    InlineKeyboardButton::callback(quality_label(*quality, *size), action.encode())
                })
                .collect()
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

/// Link to the channel plus the re-check button
pub fn subscription_keyboard(channel: &str) -> Result<InlineKeyboardMarkup, url::ParseError> {
    let url = Url::parse(&format!("https://t.me/{}", channel.trim_start_matches('@')))?;
    Ok(InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url("📢 Subscribe to the channel", url)],
        vec![InlineKeyboardButton::callback(
            "✅ I subscribed",
            CallbackAction::CheckSubscription.encode(),
        )],
    ]))
}
