//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fakes;

#[allow(unused_imports)]
pub use fakes::{Event, FakeFetcher, FakeProbe, FakeTool, FetchMode, RecordingTransport};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vidrelay::download::{DeliveryCoordinator, PipelineSettings, VideoSegmenter};
use vidrelay::storage::SessionStore;

pub const MB: u64 = 1024 * 1024;

/// Everything a coordinator test needs to inspect afterwards
#[allow(dead_code)]
pub struct Harness {
    pub coordinator: Arc<DeliveryCoordinator>,
    pub probe: Arc<FakeProbe>,
    pub fetcher: Arc<FakeFetcher>,
    pub tool: Arc<FakeTool>,
    pub transport: Arc<RecordingTransport>,
    pub download_dir: tempfile::TempDir,
}

#[allow(dead_code)]
pub fn harness(probe: FakeProbe, fetcher: FakeFetcher, transport: RecordingTransport) -> Harness {
    harness_with_ttl(probe, fetcher, transport, Duration::from_secs(3600))
}

#[allow(dead_code)]
pub fn harness_with_ttl(
    probe: FakeProbe,
    fetcher: FakeFetcher,
    transport: RecordingTransport,
    ttl: Duration,
) -> Harness {
    build_harness(probe, fetcher, FakeTool::new(120.0), transport, ttl)
}

#[allow(dead_code)]
pub fn harness_with_tool(
    probe: FakeProbe,
    fetcher: FakeFetcher,
    tool: FakeTool,
    transport: RecordingTransport,
) -> Harness {
    build_harness(probe, fetcher, tool, transport, Duration::from_secs(3600))
}

fn build_harness(
    probe: FakeProbe,
    fetcher: FakeFetcher,
    tool: FakeTool,
    transport: RecordingTransport,
    ttl: Duration,
) -> Harness {
    let download_dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(probe);
    let fetcher = Arc::new(fetcher);
    let tool = Arc::new(tool);
    let transport = Arc::new(transport);

    let settings = PipelineSettings {
        download_dir: download_dir.path().to_path_buf(),
        split_threshold_bytes: 50 * MB,
        max_part_bytes: 50 * MB,
        max_offer_bytes: 2 * 1024 * MB,
    };

    let coordinator = Arc::new(DeliveryCoordinator::new(
        probe.clone(),
        fetcher.clone(),
        VideoSegmenter::new(tool.clone()),
        transport.clone(),
        SessionStore::new(ttl),
        settings,
    ));

    Harness {
        coordinator,
        probe,
        fetcher,
        tool,
        transport,
        download_dir,
    }
}

/// Number of entries left directly under `dir`
#[allow(dead_code)]
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
