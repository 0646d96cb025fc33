//! Quality tiers, per-tier size estimates and download requests

use std::fmt;

use strum::{Display, EnumString};
use uuid::Uuid;

use crate::download::link::SupportedLink;

const MB: u64 = 1024 * 1024;

/// Target video quality, in ascending order; `Best` is the upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
pub enum QualityTier {
    #[strum(serialize = "144p")]
    P144,
    #[strum(serialize = "360p")]
    P360,
    #[strum(serialize = "480p")]
    P480,
    #[strum(serialize = "720p")]
    P720,
    #[strum(serialize = "best")]
    Best,
}

impl QualityTier {
    /// All tiers in estimate order
    pub const ALL: [QualityTier; 5] = [
        QualityTier::P144,
        QualityTier::P360,
        QualityTier::P480,
        QualityTier::P720,
        QualityTier::Best,
    ];

    /// Nominal height, `None` for `Best`
    pub fn height(self) -> Option<u32> {
        match self {
            QualityTier::P144 => Some(144),
            QualityTier::P360 => Some(360),
            QualityTier::P480 => Some(480),
            QualityTier::P720 => Some(720),
            QualityTier::Best => None,
        }
    }

    /// Estimate used when nothing better is known
    pub fn default_estimate(self) -> u64 {
        match self {
            QualityTier::P144 => 5 * MB,
            QualityTier::P360 => 15 * MB,
            QualityTier::P480 => 25 * MB,
            QualityTier::P720 => 50 * MB,
            QualityTier::Best => 100 * MB,
        }
    }

    /// yt-dlp `-f` expression: mp4 video + m4a audio capped at the tier height,
    /// then a single stream at or below that height, then anything.
    pub fn format_selector(self) -> String {
        match self {
            QualityTier::P144 => {
                "bestvideo[height<=144][ext=mp4]+bestaudio[ext=m4a]/best[height<=144][ext=mp4]/worst[ext=mp4]".to_string()
            }
            QualityTier::Best => "best[ext=mp4]/best".to_string(),
            QualityTier::P360 => capped_selector(360),
            QualityTier::P480 => capped_selector(480),
            QualityTier::P720 => capped_selector(720),
        }
    }

    fn index(self) -> usize {
        match self {
            QualityTier::P144 => 0,
            QualityTier::P360 => 1,
            QualityTier::P480 => 2,
            QualityTier::P720 => 3,
            QualityTier::Best => 4,
        }
    }
}

fn capped_selector(h: u32) -> String {
    format!("bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]")
}

/// Estimated bytes per tier, non-decreasing along `QualityTier::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    sizes: [u64; 5],
}

impl SizeEstimate {
    /// Builds an estimate from raw per-tier values (in `ALL` order), repairing
    /// monotonicity: a value below the previous (corrected) one becomes
    /// `previous * 1.5`.
    pub fn from_raw(raw: [u64; 5]) -> Self {
        let mut sizes = raw;
        let mut previous = 0u64;
        for size in sizes.iter_mut() {
            if *size < previous {
                *size = (previous as f64 * 1.5) as u64;
            }
            previous = *size;
        }
        Self { sizes }
    }

    /// The fixed fallback used when probing fails
    pub fn defaults() -> Self {
        Self::from_raw(QualityTier::ALL.map(QualityTier::default_estimate))
    }

    pub fn get(&self, tier: QualityTier) -> u64 {
        self.sizes[tier.index()]
    }

    /// `(tier, bytes)` pairs in tier order
    pub fn iter(&self) -> impl Iterator<Item = (QualityTier, u64)> + '_ {
        QualityTier::ALL.iter().map(move |tier| (*tier, self.get(*tier)))
    }

    /// Tiers whose estimate is strictly below `limit`
    pub fn offers_below(&self, limit: u64) -> Vec<(QualityTier, u64)> {
        self.iter().filter(|(_, size)| *size < limit).collect()
    }
}

impl Default for SizeEstimate {
    fn default() -> Self {
        Self::defaults()
    }
}

/// One user-chosen download, consumed once by the fetcher.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub id: Uuid,
    pub link: SupportedLink,
    pub quality: QualityTier,
}

impl MediaRequest {
    pub fn new(link: SupportedLink, quality: QualityTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            link,
            quality,
        }
    }
}

impl fmt::Display for MediaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.link.platform, self.quality, self.id)
    }
}
