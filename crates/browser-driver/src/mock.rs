//! Deterministic driver double.
//!
//! Holds an ordered list of canned page states plus a cursor into it. A `navigate` against
//! the page advances to the next canned state when one exists and otherwise rewrites the
//! current state's URL in place. Every `act` call is recorded verbatim.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bic_contract::PageIdentity;
use parking_lot::Mutex;
use tracing::debug;

use crate::driver::BrowserDriver;
use crate::errors::{DriverError, DriverResult};
use crate::types::{
    ActRequest, DownloadInfo, DownloadState, DriverAction, DriverTarget, RawSnapshot,
    SnapshotRequest,
};

#[derive(Debug)]
struct MockState {
    states: Vec<RawSnapshot>,
    index: usize,
    actions: Vec<ActRequest>,
    snapshot_requests: Vec<SnapshotRequest>,
    downloads: Vec<DownloadInfo>,
    pending_downloads: VecDeque<DownloadInfo>,
    closed: bool,
}

#[derive(Debug)]
pub struct MockDriver {
    inner: Mutex<MockState>,
}

impl MockDriver {
    pub fn new(states: Vec<RawSnapshot>) -> Self {
        let states = if states.is_empty() {
            vec![RawSnapshot::new(PageIdentity::from_url("about:blank"))]
        } else {
            states
        };
        Self {
            inner: Mutex::new(MockState {
                states,
                index: 0,
                actions: Vec::new(),
                snapshot_requests: Vec::new(),
                downloads: Vec::new(),
                pending_downloads: VecDeque::new(),
                closed: false,
            }),
        }
    }

    pub fn single(state: RawSnapshot) -> Self {
        Self::new(vec![state])
    }

    /// Queues a download that the next `wait_for_download` call will report as completed.
    pub fn queue_download(&self, url: &str, suggested_filename: &str) {
        let mut inner = self.inner.lock();
        let guid = format!("dl-{}", inner.downloads.len() + inner.pending_downloads.len() + 1);
        inner.pending_downloads.push_back(DownloadInfo {
            guid,
            url: url.to_string(),
            suggested_filename: suggested_filename.to_string(),
            path: None,
            state: DownloadState::Completed,
        });
    }

    pub fn recorded_actions(&self) -> Vec<ActRequest> {
        self.inner.lock().actions.clone()
    }

    pub fn snapshot_requests(&self) -> Vec<SnapshotRequest> {
        self.inner.lock().snapshot_requests.clone()
    }

    pub fn state_index(&self) -> usize {
        self.inner.lock().index
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn snapshot(&self, request: &SnapshotRequest) -> DriverResult<RawSnapshot> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(DriverError::closed());
        }
        inner.snapshot_requests.push(request.clone());
        Ok(inner.states[inner.index].clone())
    }

    async fn act(&self, request: ActRequest) -> DriverResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(DriverError::closed());
        }
        inner.actions.push(request.clone());

        if let (DriverTarget::Page, DriverAction::Navigate { url }) =
            (&request.target, &request.action)
        {
            if inner.index + 1 < inner.states.len() {
                inner.index += 1;
                debug!(index = inner.index, "mock driver advanced to next canned state");
            } else {
                let index = inner.index;
                inner.states[index].page.set_url(url);
                debug!(%url, "mock driver rewrote current state url");
            }
        }
        Ok(())
    }

    async fn get_downloads(&self) -> DriverResult<Vec<DownloadInfo>> {
        Ok(self.inner.lock().downloads.clone())
    }

    async fn wait_for_download(&self, _timeout: Duration) -> DriverResult<Option<DownloadInfo>> {
        let mut inner = self.inner.lock();
        let next = inner.pending_downloads.pop_front();
        if let Some(download) = &next {
            inner.downloads.push(download.clone());
        }
        Ok(next)
    }

    async fn close(&self) -> DriverResult<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
