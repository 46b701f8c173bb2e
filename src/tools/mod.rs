//! Named browser tools over the observe/act protocol.
//!
//! Every call returns `{ok:true,value}` or `{ok:false,error}`; nothing escapes as a Rust
//! error.

pub mod args;
pub mod factory;

use std::sync::Arc;
use std::time::Duration;

use bic_action_gate::{act, ActInput, ActOutcome};
use bic_browser_driver::{DownloadInfo, LaunchOptions};
use bic_contract::{BicError, ErrorEnvelope, Observation};
use bic_core_types::{ObservationId, SessionId};
use bic_perceiver::{observe, ObserveOptions, ObserveRequest};
use bic_session_store::SessionStore;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ObserveDefaults;
use crate::errors::ToolHostError;
pub use args::{
    parse_args, ActArgs, ObserveArgs, SessionArgs, SessionOpenArgs, ToolAction, ToolArgs,
    WaitForDownloadArgs,
};
pub use factory::{CdpDriverFactory, DriverFactory};

pub const SESSION_OPEN: &str = "browser_session_open";
pub const SESSION_CLOSE: &str = "browser_session_close";
pub const OBSERVE: &str = "browser_observe";
pub const ACT: &str = "browser_act";
pub const GET_DOWNLOADS: &str = "browser_get_downloads";
pub const WAIT_FOR_DOWNLOAD: &str = "browser_wait_for_download";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn descriptor<T: JsonSchema>(name: &'static str, description: &'static str) -> ToolDescriptor {
    ToolDescriptor {
        name,
        description,
        input_schema: serde_json::to_value(schema_for!(T)).unwrap_or_default(),
    }
}

/// `{ok:true,value}` / `{ok:false,error}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl ToolResult {
    pub fn success(value: Value) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(error: ErrorEnvelope) -> Self {
        Self {
            ok: false,
            value: None,
            error: Some(error),
        }
    }
}

impl From<Result<Value, ToolHostError>> for ToolResult {
    fn from(result: Result<Value, ToolHostError>) -> Self {
        match result {
            Ok(value) => ToolResult::success(value),
            Err(err) => ToolResult::failure(err.to_envelope()),
        }
    }
}

pub struct BrowserToolHost {
    store: Arc<SessionStore>,
    factory: Arc<dyn DriverFactory>,
    observe_defaults: ObserveDefaults,
}

impl BrowserToolHost {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            factory,
            observe_defaults: ObserveDefaults::default(),
        }
    }

    pub fn with_observe_defaults(mut self, defaults: ObserveDefaults) -> Self {
        self.observe_defaults = defaults;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn descriptors() -> Vec<ToolDescriptor> {
        vec![
            descriptor::<SessionOpenArgs>(
                SESSION_OPEN,
                "Open a new browser session (headless by default) and navigate to the given URL. Returns { sessionId }.",
            ),
            descriptor::<SessionArgs>(SESSION_CLOSE, "Close an existing browser session by sessionId."),
            descriptor::<ObserveArgs>(
                OBSERVE,
                "Observe the current page state and enumerate targetable affordances (BIC v0.1). Requires an existing sessionId.",
            ),
            descriptor::<ActArgs>(
                ACT,
                "Execute an action (click/fill/navigate) and return verification + nextObservation (BIC v0.1).",
            ),
            descriptor::<SessionArgs>(GET_DOWNLOADS, "Get list of all downloads for a session."),
            descriptor::<WaitForDownloadArgs>(
                WAIT_FOR_DOWNLOAD,
                "Wait for a new download to complete. Returns { download } or { download: null } on timeout.",
            ),
        ]
    }

    /// Dispatches a tool call by name.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        debug!(tool = name, "tool call");
        self.dispatch(name, arguments).await.into()
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, ToolHostError> {
        match name {
            SESSION_OPEN => {
                let session_id = self.open_session(parse_args(name, arguments)?).await?;
                Ok(json!({ "sessionId": session_id }))
            }
            SESSION_CLOSE => {
                let args: SessionArgs = parse_args(name, arguments)?;
                self.close_session(&SessionId::from(args.session_id)).await?;
                Ok(json!({ "ok": true }))
            }
            OBSERVE => {
                let observation = self.observe(parse_args(name, arguments)?).await?;
                Ok(serde_json::to_value(observation)?)
            }
            ACT => {
                let outcome = self.act(parse_args(name, arguments)?).await?;
                Ok(serde_json::to_value(outcome)?)
            }
            GET_DOWNLOADS => {
                let args: SessionArgs = parse_args(name, arguments)?;
                let downloads = self.downloads(&SessionId::from(args.session_id)).await?;
                Ok(json!({ "downloads": downloads }))
            }
            WAIT_FOR_DOWNLOAD => {
                let download = self.wait_for_download(parse_args(name, arguments)?).await?;
                Ok(json!({ "download": download }))
            }
            other => Err(ToolHostError::UnknownTool(other.to_string())),
        }
    }

    pub async fn open_session(&self, args: SessionOpenArgs) -> Result<SessionId, ToolHostError> {
        let options = LaunchOptions::from(args);
        let driver = self
            .factory
            .open(options)
            .await
            .map_err(|err| ToolHostError::Internal(err.to_string()))?;
        Ok(self.store.create_session(driver))
    }

    pub async fn close_session(&self, session_id: &SessionId) -> Result<(), ToolHostError> {
        self.store.close_session(session_id).await?;
        Ok(())
    }

    pub async fn observe(&self, args: ObserveArgs) -> Result<Observation, ToolHostError> {
        let request = ObserveRequest {
            session_id: SessionId::from(args.session_id.clone()),
            options: self.observe_options(&args),
        };
        Ok(observe(&self.store, request).await?)
    }

    pub async fn act(&self, args: ActArgs) -> Result<ActOutcome, ToolHostError> {
        let input = ActInput {
            session_id: SessionId::from(args.session_id),
            observation_id: ObservationId::from(args.observation_id),
            target: args.target,
            action: args.action.into(),
            confirm: args.confirm,
            confirmation_text: args.confirmation_text,
            expect: args.expect,
            observe: self.observe_defaults.to_options(),
        };
        Ok(act(&self.store, input).await?)
    }

    pub async fn downloads(&self, session_id: &SessionId) -> Result<Vec<DownloadInfo>, ToolHostError> {
        let driver = self.store.driver(session_id)?;
        Ok(driver.get_downloads().await.map_err(BicError::from)?)
    }

    pub async fn wait_for_download(
        &self,
        args: WaitForDownloadArgs,
    ) -> Result<Option<DownloadInfo>, ToolHostError> {
        let driver = self.store.driver(&SessionId::from(args.session_id))?;
        Ok(driver
            .wait_for_download(Duration::from_millis(args.timeout_ms))
            .await
            .map_err(BicError::from)?)
    }

    /// Closes every open session. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        let closed = self.store.close_all().await;
        if closed > 0 {
            info!(closed, "closed open sessions");
        }
        closed
    }

    fn observe_options(&self, args: &ObserveArgs) -> ObserveOptions {
        let defaults = self.observe_defaults.to_options();
        ObserveOptions {
            mode: args.mode,
            scope: args.scope.unwrap_or(defaults.scope),
            max_affordances: args.max_affordances.unwrap_or(defaults.max_affordances),
            include_hidden: args.include_hidden.unwrap_or(defaults.include_hidden),
            include_disabled: args.include_disabled.unwrap_or(defaults.include_disabled),
            cursor: args.cursor.clone(),
        }
    }
}
