//! DevTools transport: one websocket connection multiplexed across commands and events.

use std::collections::HashMap;
use std::convert::TryInto;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::{future::BoxFuture, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::errors::{DriverError, DriverErrorKind, DriverResult};
use crate::util::extract_ws_url;

#[derive(Clone, Debug, PartialEq)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn next_event(&self) -> Option<TransportEvent>;

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> DriverResult<Value>;

    /// Tears the connection down. Later commands fail with `Closed`.
    async fn shutdown(&self);
}

type RuntimeFactory =
    Arc<dyn Fn(CdpConfig) -> BoxFuture<'static, DriverResult<Arc<RuntimeState>>> + Send + Sync>;

/// Transport backed by a launched (or attached) Chromium process.
///
/// The underlying runtime is created lazily and recreated if its command loop dies, until
/// `shutdown` is called.
#[derive(Clone)]
pub struct ChromiumTransport {
    cfg: CdpConfig,
    state: Arc<Mutex<Option<Arc<RuntimeState>>>>,
    closed: Arc<AtomicBool>,
    factory: RuntimeFactory,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        let factory: RuntimeFactory = Arc::new(|cfg: CdpConfig| {
            Box::pin(async move {
                let state = RuntimeState::start(cfg).await?;
                Ok(Arc::new(state))
            })
        });
        Self::with_factory(cfg, factory)
    }

    fn with_factory(cfg: CdpConfig, factory: RuntimeFactory) -> Self {
        Self {
            cfg,
            state: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            factory,
        }
    }

    /// Connects eagerly so launch failures surface at session open.
    pub async fn connect(&self) -> DriverResult<()> {
        self.runtime().await.map(|_| ())
    }

    async fn runtime(&self) -> DriverResult<Arc<RuntimeState>> {
        let mut guard = self.state.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::closed());
        }

        if let Some(rt) = guard.as_ref() {
            if rt.is_alive() {
                return Ok(rt.clone());
            }
            warn!(target: "bic-driver", "cdp runtime died; reconnecting");
        }

        let runtime = (self.factory)(self.cfg.clone()).await?;
        *guard = Some(runtime.clone());
        Ok(runtime)
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn next_event(&self) -> Option<TransportEvent> {
        match self.runtime().await {
            Ok(runtime) => runtime.next_event().await,
            Err(err) => {
                debug!(target: "bic-driver", %err, "event stream unavailable");
                None
            }
        }
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> DriverResult<Value> {
        let runtime = self.runtime().await?;
        runtime
            .send_internal(
                target,
                method,
                params,
                Duration::from_millis(self.cfg.default_deadline_ms),
            )
            .await
            .map_err(|err| {
                warn!(target: "bic-driver", method, %err, "cdp command failed");
                err
            })
    }

    async fn shutdown(&self) {
        let runtime = {
            let mut guard = self.state.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            guard.take()
        };
        if let Some(runtime) = runtime {
            runtime.shutdown().await;
        }
    }
}

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: oneshot::Sender<DriverResult<Value>>,
}

struct RuntimeState {
    command_tx: mpsc::Sender<ControlMessage>,
    events_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    loop_task: JoinHandle<()>,
    heartbeat_task: Option<JoinHandle<()>>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl RuntimeState {
    async fn start(cfg: CdpConfig) -> DriverResult<Self> {
        let (child, ws_url) = match cfg.websocket_url.clone() {
            Some(url) => (None, url),
            None => {
                let browser_cfg = Self::browser_config(&cfg)?;
                Self::launch_browser(browser_cfg).await?
            }
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| DriverError::new(DriverErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(128);
        let (events_tx, events_rx) = mpsc::channel(512);

        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();

        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx, events_tx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "bic-driver", %err, "transport loop terminated with error");
            }
        });

        let heartbeat_task = Self::spawn_heartbeat(
            command_tx.clone(),
            alive.clone(),
            Duration::from_millis(cfg.heartbeat_interval_ms),
            Duration::from_millis(cfg.default_deadline_ms),
        );

        info!(target: "bic-driver", url = %ws_url, "chromium connection established");

        Ok(Self {
            command_tx,
            events_rx: Mutex::new(events_rx),
            loop_task,
            heartbeat_task,
            child: Mutex::new(child),
            alive,
        })
    }

    #[cfg(test)]
    fn test_stub() -> (Arc<Self>, Arc<AtomicBool>) {
        let (command_tx, _command_rx) = mpsc::channel(8);
        let (_events_tx, events_rx) = mpsc::channel(8);
        let alive = Arc::new(AtomicBool::new(true));
        let loop_task = tokio::spawn(futures::future::pending::<()>());

        (
            Arc::new(Self {
                command_tx,
                events_rx: Mutex::new(events_rx),
                loop_task,
                heartbeat_task: None,
                child: Mutex::new(None),
                alive: alive.clone(),
            }),
            alive,
        )
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn send_internal(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> DriverResult<Value> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            target,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx
            .send(message)
            .await
            .map_err(|err| DriverError::new(DriverErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DriverError::new(DriverErrorKind::CdpIo)
                .with_hint("command response channel closed")),
            Err(_) => Err(DriverError::new(DriverErrorKind::NavTimeout)
                .with_hint(format!("{method} timed out"))
                .retriable(true)),
        }
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.events_rx.lock().await.recv().await
    }

    async fn shutdown(&self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();
        if let Some(handle) = &self.heartbeat_task {
            handle.abort();
        }
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                warn!(target: "bic-driver", %err, "failed to kill chromium child");
            }
        }
    }

    fn spawn_heartbeat(
        sender: mpsc::Sender<ControlMessage>,
        alive: Arc<AtomicBool>,
        interval_duration: Duration,
        deadline: Duration,
    ) -> Option<JoinHandle<()>> {
        if interval_duration.is_zero() {
            return None;
        }
        let response_deadline = deadline.min(Duration::from_secs(5));

        Some(tokio::spawn(async move {
            let mut ticker = interval(interval_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while alive.load(Ordering::Relaxed) {
                ticker.tick().await;
                if !alive.load(Ordering::Relaxed) {
                    break;
                }

                let (resp_tx, resp_rx) = oneshot::channel();
                let message = ControlMessage {
                    target: CommandTarget::Browser,
                    method: "Browser.getVersion".to_string(),
                    params: Value::Object(Default::default()),
                    responder: resp_tx,
                };
                if sender.send(message).await.is_err() {
                    debug!(target: "bic-driver", "heartbeat send failed (channel closed)");
                    break;
                }

                match tokio::time::timeout(response_deadline, resp_rx).await {
                    Ok(Ok(Ok(_))) => {}
                    Ok(Ok(Err(err))) => {
                        warn!(target: "bic-driver", %err, "heartbeat command error");
                        break;
                    }
                    Ok(Err(_)) => {
                        debug!(target: "bic-driver", "heartbeat response channel closed");
                        break;
                    }
                    Err(_) => {
                        warn!(target: "bic-driver", "heartbeat timed out");
                        break;
                    }
                }
            }
        }))
    }

    fn browser_config(cfg: &CdpConfig) -> DriverResult<BrowserConfig> {
        let launch_err = |hint: String| DriverError::new(DriverErrorKind::Launch).with_hint(hint);

        let executable = cfg.resolve_executable().ok_or_else(|| {
            launch_err("no chrome/chromium executable found; set BIC_CHROME".to_string())
        })?;

        let profile_dir = if cfg.user_data_dir.is_absolute() {
            cfg.user_data_dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|err| launch_err(format!("failed to resolve cwd for user-data-dir: {err}")))?
                .join(&cfg.user_data_dir)
        };
        fs::create_dir_all(&profile_dir)
            .map_err(|err| launch_err(format!("failed to ensure user-data-dir: {err}")))?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
            .launch_timeout(Duration::from_secs(20))
            .chrome_executable(executable)
            .user_data_dir(profile_dir);

        if !cfg.headless {
            builder = builder.with_head();
        }
        if std::env::var("BIC_DISABLE_SANDBOX")
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(false)
        {
            builder = builder.no_sandbox();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-sync",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--remote-allow-origins=*",
            "--use-mock-keychain",
        ];
        if cfg.headless {
            args.push("--headless=new");
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }

        builder
            .args(args)
            .build()
            .map_err(|err| launch_err(format!("browser config error: {err}")))
    }

    async fn launch_browser(config: BrowserConfig) -> DriverResult<(Option<Child>, String)> {
        let mut child = config.launch().map_err(|err| {
            DriverError::new(DriverErrorKind::Launch)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let ws_url = extract_ws_url(&mut child)
            .await
            .map_err(|err| DriverError::new(DriverErrorKind::Launch).with_hint(err.to_string()))?;

        Ok((Some(child), ws_url))
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> DriverResult<()> {
        let mut inflight: HashMap<CallId, oneshot::Sender<DriverResult<Value>>> = HashMap::new();

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    Self::handle_command(&mut conn, cmd, &mut inflight)?;
                }
                message = conn.next() => {
                    match message {
                        Some(Ok(Message::Response(resp))) => {
                            if let Some(sender) = inflight.remove(&resp.id) {
                                let _ = sender.send(Self::extract_payload(resp));
                            }
                        }
                        Some(Ok(Message::Event(event))) => {
                            if let Err(err) = Self::forward_event(event, &event_tx).await {
                                warn!(target: "bic-driver", %err, "failed to forward event");
                            }
                        }
                        Some(Err(err)) => {
                            let err = Self::map_cdp_error(err);
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(err.clone()));
                            }
                            return Err(err);
                        }
                        None => {
                            let err = DriverError::new(DriverErrorKind::CdpIo)
                                .with_hint("cdp connection closed");
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(err.clone()));
                            }
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_command(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut HashMap<CallId, oneshot::Sender<DriverResult<Value>>>,
    ) -> DriverResult<()> {
        let session = match cmd.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(session_id) => Some(CdpSessionId::from(session_id)),
        };

        let method_id: MethodId = cmd.method.into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                inflight.insert(call_id, cmd.responder);
                Ok(())
            }
            Err(err) => {
                let err = DriverError::new(DriverErrorKind::CdpIo).with_hint(err.to_string());
                let _ = cmd.responder.send(Err(err.clone()));
                Err(err)
            }
        }
    }

    async fn forward_event(
        event: CdpEventMessage,
        event_tx: &mpsc::Sender<TransportEvent>,
    ) -> DriverResult<()> {
        let raw: CdpJsonEventMessage = event
            .try_into()
            .map_err(|err| DriverError::internal(format!("failed to decode cdp event: {err}")))?;

        event_tx
            .send(TransportEvent {
                method: raw.method.into_owned(),
                params: raw.params,
                session_id: raw.session_id,
            })
            .await
            .map_err(|err| DriverError::internal(err.to_string()))
    }

    fn extract_payload(resp: Response) -> DriverResult<Value> {
        if let Some(result) = resp.result {
            Ok(result)
        } else if let Some(error) = resp.error {
            Err(DriverError::new(DriverErrorKind::CdpIo)
                .with_hint(format!("cdp error {}: {}", error.code, error.message))
                .retriable(error.code >= 500))
        } else {
            Err(DriverError::internal("empty cdp response"))
        }
    }

    fn map_cdp_error(err: CdpError) -> DriverError {
        let hint = err.to_string();
        match err {
            CdpError::Timeout => DriverError::new(DriverErrorKind::NavTimeout)
                .with_hint(hint)
                .retriable(true),
            CdpError::Ws(_) | CdpError::Io(_) | CdpError::NoResponse => {
                DriverError::new(DriverErrorKind::CdpIo)
                    .with_hint(hint)
                    .retriable(true)
            }
            _ => DriverError::internal(hint),
        }
    }
}

impl Drop for RuntimeState {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();
        if let Some(handle) = &self.heartbeat_task {
            handle.abort();
        }

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "bic-driver", %err, "failed to kill chromium child");
                        }
                    });
                }
            }
        }
    }
}
