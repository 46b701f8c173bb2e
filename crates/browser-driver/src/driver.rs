use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DriverResult;
use crate::types::{ActRequest, DownloadInfo, RawSnapshot, SnapshotRequest};

/// Capability surface the protocol core needs from a browser backend.
///
/// A session owns exactly one driver for its lifetime; `close` is called once when the
/// session is closed and must release the underlying browser resources.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn snapshot(&self, request: &SnapshotRequest) -> DriverResult<RawSnapshot>;

    async fn act(&self, request: ActRequest) -> DriverResult<()>;

    async fn get_downloads(&self) -> DriverResult<Vec<DownloadInfo>>;

    /// Resolves with the next download that completes, or `None` once `timeout` elapses.
    async fn wait_for_download(&self, timeout: Duration) -> DriverResult<Option<DownloadInfo>>;

    async fn close(&self) -> DriverResult<()>;
}
