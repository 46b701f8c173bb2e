//! Production driver speaking the Chromium DevTools protocol.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bic_contract::{
    domain_of, Banner, Blocker, BlockingOverlay, FrameInfo, LoadState, Modal, PageIdentity,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::downloads::DownloadTracker;
use crate::driver::BrowserDriver;
use crate::errors::{DriverError, DriverErrorKind, DriverResult};
use crate::scripts;
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget};
use crate::types::{
    is_interactive_role, ActRequest, DownloadInfo, DriverAction, DriverTarget, LaunchOptions,
    RawAxNode, RawDomNode, RawSnapshot, SnapshotRequest,
};

/// Result of [`scripts::PAGE_PROBE`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProbe {
    url: String,
    #[serde(default)]
    pathname: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    heading: Option<String>,
    ready_state: String,
    #[serde(default)]
    modals: Vec<Modal>,
    #[serde(default)]
    banners: Vec<Banner>,
    #[serde(default)]
    blockers: Vec<Blocker>,
    #[serde(default)]
    overlay: BlockingOverlay,
    #[serde(default)]
    frames: Vec<FrameInfo>,
}

impl PageProbe {
    fn into_identity(self, requested_url: Option<String>) -> PageIdentity {
        let load_state = match self.ready_state.as_str() {
            "loading" => LoadState::Loading,
            "interactive" => LoadState::Interactive,
            _ => LoadState::NetworkIdle,
        };
        PageIdentity {
            domain: domain_of(&self.url),
            url: requested_url.unwrap_or_else(|| self.url.clone()),
            final_url: self.url,
            lang: self.lang.filter(|value| !value.is_empty()),
            title: self.title.filter(|value| !value.is_empty()),
            primary_heading: self.heading.filter(|value| !value.is_empty()),
            route_key: self.pathname.filter(|value| !value.is_empty()),
            load_state,
            blocking_overlay: self.overlay,
            blockers: self.blockers,
            banners: self.banners,
            modals: self.modals,
            frames: self.frames,
        }
    }
}

/// One page target driven over a [`CdpTransport`].
pub struct CdpDriver {
    transport: Arc<dyn CdpTransport>,
    cfg: CdpConfig,
    target_id: String,
    session: CommandTarget,
    slow_mo: Duration,
    requested_url: Mutex<Option<String>>,
    downloads: Arc<DownloadTracker>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl CdpDriver {
    /// Launches (or attaches to) a browser and opens `options.url` in a fresh target.
    pub async fn launch(mut cfg: CdpConfig, options: LaunchOptions) -> DriverResult<Self> {
        if let Some(headless) = options.headless {
            cfg.headless = headless;
        }
        if let Some(executable) = &options.executable_path {
            cfg.executable = executable.clone();
        }
        if let Some(dir) = &options.download_dir {
            cfg.download_dir = Some(dir.clone());
        }

        let transport = ChromiumTransport::new(cfg.clone());
        transport.connect().await?;
        Self::connect(Arc::new(transport), cfg, options).await
    }

    /// Opens a page target over an already connected transport.
    pub async fn connect(
        transport: Arc<dyn CdpTransport>,
        cfg: CdpConfig,
        options: LaunchOptions,
    ) -> DriverResult<Self> {
        let created = transport
            .send_command(
                CommandTarget::Browser,
                "Target.createTarget",
                json!({ "url": "about:blank" }),
            )
            .await?;
        let target_id = string_field(&created, "targetId")?;

        let attached = transport
            .send_command(
                CommandTarget::Browser,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session = CommandTarget::Session(string_field(&attached, "sessionId")?);

        for domain in ["Page", "DOM", "Accessibility", "Runtime"] {
            transport
                .send_command(session.clone(), &format!("{domain}.enable"), json!({}))
                .await?;
        }

        let download_dir = absolute_download_dir(cfg.download_dir.as_deref())?;
        if let Some(dir) = &download_dir {
            transport
                .send_command(
                    CommandTarget::Browser,
                    "Browser.setDownloadBehavior",
                    json!({
                        "behavior": "allowAndName",
                        "downloadPath": dir,
                        "eventsEnabled": true,
                    }),
                )
                .await?;
        }

        let downloads = Arc::new(DownloadTracker::new(download_dir));
        let pump = spawn_event_pump(transport.clone(), downloads.clone());

        let driver = Self {
            transport,
            cfg,
            target_id,
            session,
            slow_mo: Duration::from_millis(options.slow_mo_ms.unwrap_or(0)),
            requested_url: Mutex::new(None),
            downloads,
            pump: Mutex::new(Some(pump)),
            closed: AtomicBool::new(false),
        };

        if let Some(path) = &options.storage_state_path {
            driver.load_storage_state(path).await?;
        }
        if !options.url.is_empty() {
            driver.navigate(&options.url).await?;
        }
        info!(target: "bic-driver", target_id = %driver.target_id, url = %options.url, "page target ready");
        Ok(driver)
    }

    async fn send(&self, method: &str, params: Value) -> DriverResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::closed());
        }
        self.transport
            .send_command(self.session.clone(), method, params)
            .await
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        let response = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(details) = response.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("script threw");
            return Err(DriverError::internal(format!("evaluation failed: {text}")));
        }
        Ok(response
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn load_storage_state(&self, path: &Path) -> DriverResult<()> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            DriverError::new(DriverErrorKind::Launch)
                .with_hint(format!("cannot read storage state {}: {err}", path.display()))
        })?;
        let state: Value = serde_json::from_str(&raw).map_err(|err| {
            DriverError::new(DriverErrorKind::Launch)
                .with_hint(format!("invalid storage state {}: {err}", path.display()))
        })?;
        let cookies = state.get("cookies").cloned().unwrap_or_else(|| json!([]));
        let count = cookies.as_array().map(Vec::len).unwrap_or(0);
        if count > 0 {
            self.send("Network.setCookies", json!({ "cookies": cookies }))
                .await?;
        }
        debug!(target: "bic-driver", cookies = count, "storage state applied");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        *self.requested_url.lock() = Some(url.to_string());
        let response = self.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = response.get("errorText").and_then(Value::as_str) {
            return Err(DriverError::new(DriverErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed: {error}")));
        }
        self.wait_until_ready().await
    }

    async fn wait_until_ready(&self) -> DriverResult<()> {
        let deadline = Instant::now() + Duration::from_millis(self.cfg.navigation_timeout_ms);
        loop {
            let state = self.evaluate(scripts::READY_STATE).await?;
            if matches!(state.as_str(), Some("interactive" | "complete")) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::new(DriverErrorKind::NavTimeout)
                    .with_hint(format!(
                        "page not ready after {}ms",
                        self.cfg.navigation_timeout_ms
                    ))
                    .retriable(true));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Direct child frames sharing the top document's origin. The page probe annotates
    /// exactly these, so their elements carry a frame key the action scripts can route by.
    async fn same_origin_child_frames(&self) -> Vec<String> {
        let tree = match self.send("Page.getFrameTree", json!({})).await {
            Ok(tree) => tree,
            Err(err) => {
                debug!(target: "bic-driver", %err, "frame tree unavailable");
                return Vec::new();
            }
        };
        let root = &tree["frameTree"];
        let Some(origin) = origin_of(root) else {
            return Vec::new();
        };
        root["childFrames"]
            .as_array()
            .map(|children| {
                children
                    .iter()
                    .filter(|child| origin_of(child) == Some(origin))
                    .filter_map(|child| child.pointer("/frame/id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn describe(&self, backend_node_id: i64) -> DriverResult<RawDomNode> {
        let response = self
            .send(
                "DOM.describeNode",
                json!({ "backendNodeId": backend_node_id }),
            )
            .await?;
        Ok(parse_dom_node(backend_node_id, &response["node"]))
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn snapshot(&self, request: &SnapshotRequest) -> DriverResult<RawSnapshot> {
        let probe_value = self.evaluate(scripts::PAGE_PROBE).await?;
        let probe: PageProbe = serde_json::from_value(probe_value)
            .map_err(|err| DriverError::internal(format!("unexpected probe result: {err}")))?;
        let page = probe.into_identity(self.requested_url.lock().clone());

        let tree = self.send("Accessibility.getFullAXTree", json!({})).await?;
        let mut ax_nodes = parse_ax_tree(&tree);
        for frame_id in self.same_origin_child_frames().await {
            match self
                .send("Accessibility.getFullAXTree", json!({ "frameId": frame_id }))
                .await
            {
                Ok(tree) => ax_nodes.extend(parse_ax_tree(&tree)),
                Err(err) => {
                    debug!(target: "bic-driver", %frame_id, %err, "frame AX tree unavailable")
                }
            }
        }

        let mut dom_nodes = Vec::new();
        for node in &ax_nodes {
            let Some(backend_id) = node.backend_dom_node_id else {
                continue;
            };
            if node.ignored || !is_interactive_role(&node.role) {
                continue;
            }
            match self.describe(backend_id).await {
                Ok(dom) => dom_nodes.push(dom),
                Err(err) => {
                    debug!(target: "bic-driver", backend_id, %err, "describeNode failed; node dropped")
                }
            }
        }

        debug!(
            target: "bic-driver",
            scope = ?request.scope,
            ax = ax_nodes.len(),
            dom = dom_nodes.len(),
            "snapshot captured"
        );
        Ok(RawSnapshot {
            page,
            ax_nodes,
            dom_nodes,
            partial_dom: true,
        })
    }

    async fn act(&self, request: ActRequest) -> DriverResult<()> {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
        let kind = request.action.action_type();

        match (&request.target, &request.action) {
            (DriverTarget::Page, DriverAction::Navigate { url }) => self.navigate(url).await,
            (_, DriverAction::Evaluate { expression }) => {
                self.evaluate(expression).await.map(|_| ())
            }
            (DriverTarget::Element(element), DriverAction::Click) => {
                let frame = element.frame_id.as_ref().map(|id| id.as_str());
                let found = self
                    .evaluate(&scripts::click(&element.selector, frame))
                    .await?;
                ensure_found(found, &element.selector, kind)
            }
            (DriverTarget::Element(element), DriverAction::Fill { value }) => {
                let frame = element.frame_id.as_ref().map(|id| id.as_str());
                let found = self
                    .evaluate(&scripts::fill(&element.selector, value, frame))
                    .await?;
                ensure_found(found, &element.selector, kind)
            }
            (target, action) => Err(DriverError::new(DriverErrorKind::Unsupported).with_hint(
                format!("{} is not supported on {:?}", action.action_type(), target),
            )),
        }
    }

    async fn get_downloads(&self) -> DriverResult<Vec<DownloadInfo>> {
        Ok(self.downloads.snapshot())
    }

    async fn wait_for_download(&self, timeout: Duration) -> DriverResult<Option<DownloadInfo>> {
        Ok(self.downloads.wait_for_completion(timeout).await)
    }

    async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        if let Err(err) = self
            .transport
            .send_command(
                CommandTarget::Browser,
                "Target.closeTarget",
                json!({ "targetId": self.target_id }),
            )
            .await
        {
            warn!(target: "bic-driver", %err, "closeTarget failed");
        }
        self.transport.shutdown().await;
        info!(target: "bic-driver", target_id = %self.target_id, "page target closed");
        Ok(())
    }
}

impl Drop for CdpDriver {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
    }
}

fn spawn_event_pump(
    transport: Arc<dyn CdpTransport>,
    downloads: Arc<DownloadTracker>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = transport.next_event().await {
            downloads.handle_event(&event.method, &event.params);
        }
        debug!(target: "bic-driver", "event stream ended");
    })
}

fn ensure_found(found: Value, selector: &str, action: &str) -> DriverResult<()> {
    if found.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(DriverError::new(DriverErrorKind::TargetNotFound)
            .with_hint(format!("{action}: no element matches {selector}")))
    }
}

fn string_field(value: &Value, field: &str) -> DriverResult<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::internal(format!("cdp response missing {field}")))
}

fn absolute_download_dir(dir: Option<&Path>) -> DriverResult<Option<std::path::PathBuf>> {
    let Some(dir) = dir else {
        return Ok(None);
    };
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| DriverError::internal(format!("cannot resolve cwd: {err}")))?
            .join(dir)
    };
    std::fs::create_dir_all(&absolute).map_err(|err| {
        DriverError::new(DriverErrorKind::Launch)
            .with_hint(format!("cannot create {}: {err}", absolute.display()))
    })?;
    Ok(Some(absolute))
}

/// Reads `node[field].value` as a string, the shape CDP uses for AX properties.
fn ax_value(node: &Value, field: &str) -> Option<String> {
    node.get(field)?
        .get("value")?
        .as_str()
        .map(str::to_string)
}

fn origin_of(frame_tree: &Value) -> Option<&str> {
    frame_tree
        .pointer("/frame/securityOrigin")
        .and_then(Value::as_str)
}

fn parse_ax_tree(tree: &Value) -> Vec<RawAxNode> {
    tree["nodes"]
        .as_array()
        .map(|nodes| nodes.iter().filter_map(parse_ax_node).collect())
        .unwrap_or_default()
}

fn parse_ax_node(node: &Value) -> Option<RawAxNode> {
    Some(RawAxNode {
        node_id: node.get("nodeId")?.as_str()?.to_string(),
        role: ax_value(node, "role").unwrap_or_default(),
        name: ax_value(node, "name").unwrap_or_default(),
        backend_dom_node_id: node.get("backendDOMNodeId").and_then(Value::as_i64),
        ignored: node.get("ignored").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn parse_dom_node(backend_node_id: i64, node: &Value) -> RawDomNode {
    let mut attributes = BTreeMap::new();
    if let Some(flat) = node.get("attributes").and_then(Value::as_array) {
        for pair in flat.chunks(2) {
            if let [key, value] = pair {
                if let (Some(key), Some(value)) = (key.as_str(), value.as_str()) {
                    attributes.insert(key.to_string(), value.to_string());
                }
            }
        }
    }
    RawDomNode {
        backend_node_id,
        node_name: node
            .get("nodeName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        attributes,
    }
}
