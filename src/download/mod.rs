//! Media acquisition and delivery pipeline

pub mod error;
pub mod fetch;
pub mod link;
pub mod pipeline;
pub mod probe;
pub mod quality;
pub mod segment;

// Re-exports for convenience
pub use error::DownloadError;
pub use fetch::{MediaFetcher, YtDlpFetcher};
pub use link::{classify, short_token, LinkClass, Platform, SupportedLink};
pub use pipeline::{ChatTransport, DeliveryCoordinator, DeliveryReport, LinkOffer, PipelineSettings, TransportError};
pub use probe::{MediaProbe, YtDlpProbe};
pub use quality::{MediaRequest, QualityTier, SizeEstimate};
pub use segment::{FfmpegTool, MediaTool, VideoPart, VideoSegmenter};
