//! Download bookkeeping fed by `Browser.downloadWillBegin` / `Browser.downloadProgress`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::types::{DownloadInfo, DownloadState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WillBegin {
    guid: String,
    url: String,
    #[serde(default)]
    suggested_filename: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Progress {
    guid: String,
    state: String,
}

#[derive(Debug)]
pub struct DownloadTracker {
    dir: Option<PathBuf>,
    entries: Mutex<Vec<DownloadInfo>>,
    changes: watch::Sender<u64>,
}

impl DownloadTracker {
    pub fn new(dir: Option<PathBuf>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            dir,
            entries: Mutex::new(Vec::new()),
            changes,
        }
    }

    /// Applies one transport event. Returns `true` when it was a download event.
    pub fn handle_event(&self, method: &str, params: &Value) -> bool {
        match method {
            "Browser.downloadWillBegin" | "Page.downloadWillBegin" => {
                let Ok(event) = serde_json::from_value::<WillBegin>(params.clone()) else {
                    return false;
                };
                debug!(guid = %event.guid, url = %event.url, "download started");
                let mut entries = self.entries.lock();
                if !entries.iter().any(|entry| entry.guid == event.guid) {
                    entries.push(DownloadInfo {
                        guid: event.guid,
                        url: event.url,
                        suggested_filename: event.suggested_filename,
                        path: None,
                        state: DownloadState::InProgress,
                    });
                }
            }
            "Browser.downloadProgress" | "Page.downloadProgress" => {
                let Ok(event) = serde_json::from_value::<Progress>(params.clone()) else {
                    return false;
                };
                let state = match event.state.as_str() {
                    "completed" => DownloadState::Completed,
                    "canceled" => DownloadState::Canceled,
                    _ => DownloadState::InProgress,
                };
                let mut entries = self.entries.lock();
                let Some(entry) = entries.iter_mut().find(|entry| entry.guid == event.guid) else {
                    return false;
                };
                if entry.state == state {
                    return true;
                }
                entry.state = state;
                if state == DownloadState::Completed {
                    entry.path = self.dir.as_ref().map(|dir| dir.join(&entry.guid));
                    info!(guid = %entry.guid, file = %entry.suggested_filename, "download completed");
                }
            }
            _ => return false,
        }
        self.changes.send_modify(|counter| *counter += 1);
        true
    }

    pub fn snapshot(&self) -> Vec<DownloadInfo> {
        self.entries.lock().clone()
    }

    /// Waits for a download that completes after this call starts.
    pub async fn wait_for_completion(&self, timeout: Duration) -> Option<DownloadInfo> {
        let mut changes = self.changes.subscribe();
        let baseline: HashSet<String> = self
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.state == DownloadState::Completed)
            .map(|entry| entry.guid.clone())
            .collect();

        let wait = async {
            loop {
                let fresh = self
                    .entries
                    .lock()
                    .iter()
                    .find(|entry| {
                        entry.state == DownloadState::Completed && !baseline.contains(&entry.guid)
                    })
                    .cloned();
                if fresh.is_some() {
                    return fresh;
                }
                if changes.changed().await.is_err() {
                    return None;
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}
