//! Tool argument types. Unknown fields are rejected; range and URL checks live in
//! [`ToolArgs::issues`].

use std::path::PathBuf;

use bic_action_gate::{ActTarget, Expectations};
use bic_browser_driver::{DriverAction, LaunchOptions};
use bic_contract::{ObserveMode, ObserveScope, MAX_AFFORDANCES, MIN_AFFORDANCES};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::errors::ToolHostError;

pub const MAX_SLOW_MO_MS: u64 = 2_000;
pub const MIN_WAIT_MS: u64 = 1_000;
pub const MAX_WAIT_MS: u64 = 60_000;
pub const DEFAULT_WAIT_MS: u64 = 30_000;

pub trait ToolArgs: DeserializeOwned + JsonSchema {
    /// Semantic problems serde cannot express. Empty means valid.
    fn issues(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Deserializes and checks arguments; any failure is a contract mismatch for `tool`.
pub fn parse_args<T: ToolArgs>(tool: &str, arguments: Value) -> Result<T, ToolHostError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let parsed: T = serde_json::from_value(arguments)
        .map_err(|err| ToolHostError::invalid(tool, vec![err.to_string()]))?;
    let issues = parsed.issues();
    if issues.is_empty() {
        Ok(parsed)
    } else {
        Err(ToolHostError::invalid(tool, issues))
    }
}

fn require_non_empty(issues: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(format!("{field}: must not be empty"));
    }
}

fn require_url(issues: &mut Vec<String>, field: &str, value: &str) {
    if let Err(err) = Url::parse(value) {
        issues.push(format!("{field}: invalid url ({err})"));
    }
}

fn optional_non_empty(issues: &mut Vec<String>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        require_non_empty(issues, field, value);
    }
}

fn default_true() -> bool {
    true
}

fn default_wait_ms() -> u64 {
    DEFAULT_WAIT_MS
}

#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionOpenArgs {
    /// Initial URL to open
    pub url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub slow_mo_ms: Option<u64>,
    /// Optional Chrome/Chromium executable path
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    /// Cookie storage state JSON used to seed the session
    #[serde(default)]
    pub storage_state_path: Option<PathBuf>,
    /// Directory for downloads
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl ToolArgs for SessionOpenArgs {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        require_url(&mut issues, "url", &self.url);
        if self.slow_mo_ms.is_some_and(|ms| ms > MAX_SLOW_MO_MS) {
            issues.push(format!("slowMoMs: must be between 0 and {MAX_SLOW_MO_MS}"));
        }
        issues
    }
}

impl From<SessionOpenArgs> for LaunchOptions {
    fn from(args: SessionOpenArgs) -> Self {
        LaunchOptions {
            url: args.url,
            headless: Some(args.headless),
            slow_mo_ms: args.slow_mo_ms,
            executable_path: args.executable_path,
            storage_state_path: args.storage_state_path,
            download_dir: args.download_dir,
        }
    }
}

/// Used by `browser_session_close` and `browser_get_downloads`.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionArgs {
    /// Browser session identifier
    pub session_id: String,
}

impl ToolArgs for SessionArgs {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        require_non_empty(&mut issues, "sessionId", &self.session_id);
        issues
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObserveArgs {
    /// Browser session identifier
    pub session_id: String,
    #[serde(default)]
    pub mode: ObserveMode,
    #[serde(default)]
    pub scope: Option<ObserveScope>,
    /// Max affordances (1-200)
    #[serde(default)]
    pub max_affordances: Option<usize>,
    #[serde(default)]
    pub include_hidden: Option<bool>,
    #[serde(default)]
    pub include_disabled: Option<bool>,
    /// Paging cursor (from a prior observation's nextCursor)
    #[serde(default)]
    pub cursor: Option<String>,
}

impl ToolArgs for ObserveArgs {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        require_non_empty(&mut issues, "sessionId", &self.session_id);
        if let Some(max) = self.max_affordances {
            if !(MIN_AFFORDANCES..=MAX_AFFORDANCES).contains(&max) {
                issues.push(format!(
                    "maxAffordances: must be between {MIN_AFFORDANCES} and {MAX_AFFORDANCES}"
                ));
            }
        }
        optional_non_empty(&mut issues, "cursor", self.cursor.as_deref());
        issues
    }
}

/// Actions a tool caller may request. Script evaluation stays internal to the driver.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ToolAction {
    Click,
    Fill { value: String },
    Navigate { url: String },
}

impl From<ToolAction> for DriverAction {
    fn from(action: ToolAction) -> Self {
        match action {
            ToolAction::Click => DriverAction::Click,
            ToolAction::Fill { value } => DriverAction::Fill { value },
            ToolAction::Navigate { url } => DriverAction::Navigate { url },
        }
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActArgs {
    pub session_id: String,
    pub observation_id: String,
    #[serde(default)]
    pub target: ActTarget,
    pub action: ToolAction,
    #[serde(default)]
    pub confirm: Option<bool>,
    #[serde(default)]
    pub confirmation_text: Option<String>,
    #[serde(default)]
    pub expect: Option<Expectations>,
}

impl ToolArgs for ActArgs {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        require_non_empty(&mut issues, "sessionId", &self.session_id);
        require_non_empty(&mut issues, "observationId", &self.observation_id);
        if let ActTarget::Element {
            action_id, label, ..
        } = &self.target
        {
            require_non_empty(&mut issues, "target.actionId", action_id.as_str());
            optional_non_empty(&mut issues, "target.label", label.as_deref());
        }
        if let ToolAction::Navigate { url } = &self.action {
            require_url(&mut issues, "action.url", url);
        }
        if let Some(expect) = &self.expect {
            for (field, value) in [
                ("expect.urlContains", &expect.url_contains),
                ("expect.titleContains", &expect.title_contains),
                ("expect.headingContains", &expect.heading_contains),
                ("expect.modalTitleContains", &expect.modal_title_contains),
                ("expect.bannerContains", &expect.banner_contains),
            ] {
                optional_non_empty(&mut issues, field, value.as_deref());
            }
        }
        issues
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WaitForDownloadArgs {
    /// Browser session identifier
    pub session_id: String,
    /// Timeout in milliseconds
    #[serde(default = "default_wait_ms")]
    pub timeout_ms: u64,
}

impl ToolArgs for WaitForDownloadArgs {
    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        require_non_empty(&mut issues, "sessionId", &self.session_id);
        if !(MIN_WAIT_MS..=MAX_WAIT_MS).contains(&self.timeout_ms) {
            issues.push(format!(
                "timeoutMs: must be between {MIN_WAIT_MS} and {MAX_WAIT_MS}"
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bic_contract::Risk;
    use serde_json::json;

    fn issues_of<T: ToolArgs>(arguments: Value) -> Vec<String> {
        match parse_args::<T>("tool", arguments) {
            Err(ToolHostError::InvalidArguments { issues, .. }) => issues,
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => Vec::new(),
        }
    }

    #[test]
    fn open_defaults_to_headless() {
        let args: SessionOpenArgs =
            parse_args("browser_session_open", json!({"url": "https://example.com"})).unwrap();
        assert!(args.headless);
        let options = LaunchOptions::from(args);
        assert_eq!(options.headless, Some(true));
        assert_eq!(options.slow_mo_ms, None);
    }

    #[test]
    fn open_rejects_bad_url_and_slow_mo() {
        let issues = issues_of::<SessionOpenArgs>(json!({"url": "not a url", "slowMoMs": 5000}));
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("url:"));
        assert!(issues[1].starts_with("slowMoMs:"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let issues = issues_of::<SessionArgs>(json!({"sessionId": "s", "extra": 1}));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("extra"));
    }

    #[test]
    fn observe_range_checks() {
        assert!(!issues_of::<ObserveArgs>(json!({"sessionId": "s", "maxAffordances": 0})).is_empty());
        assert!(!issues_of::<ObserveArgs>(json!({"sessionId": "s", "maxAffordances": 201})).is_empty());
        assert!(issues_of::<ObserveArgs>(json!({"sessionId": "s", "maxAffordances": 200})).is_empty());
        assert!(!issues_of::<ObserveArgs>(json!({"sessionId": "s", "mode": "vision"})).is_empty());
    }

    #[test]
    fn act_defaults_target_to_page() {
        let args: ActArgs = parse_args(
            "browser_act",
            json!({"sessionId": "s", "observationId": "o", "action": {"type": "click"}}),
        )
        .unwrap();
        assert_eq!(args.target, ActTarget::Page);
        assert_eq!(DriverAction::from(args.action), DriverAction::Click);
    }

    #[test]
    fn act_element_risk_defaults_safe() {
        let args: ActArgs = parse_args(
            "browser_act",
            json!({
                "sessionId": "s",
                "observationId": "o",
                "target": {"kind": "element", "actionId": "a_1"},
                "action": {"type": "fill", "value": "x"}
            }),
        )
        .unwrap();
        assert_eq!(args.target.risk(), Risk::Safe);
    }

    #[test]
    fn act_rejects_evaluate_and_bad_navigate_url() {
        assert!(!issues_of::<ActArgs>(json!({
            "sessionId": "s",
            "observationId": "o",
            "action": {"type": "evaluate", "expression": "1"}
        }))
        .is_empty());
        let issues = issues_of::<ActArgs>(json!({
            "sessionId": "s",
            "observationId": "o",
            "action": {"type": "navigate", "url": "/relative"}
        }));
        assert!(issues[0].starts_with("action.url"));
    }

    #[test]
    fn wait_timeout_bounds() {
        let args: WaitForDownloadArgs =
            parse_args("browser_wait_for_download", json!({"sessionId": "s"})).unwrap();
        assert_eq!(args.timeout_ms, DEFAULT_WAIT_MS);
        assert!(!issues_of::<WaitForDownloadArgs>(json!({"sessionId": "s", "timeoutMs": 10})).is_empty());
    }

    #[test]
    fn null_arguments_mean_empty_object() {
        let issues = issues_of::<SessionArgs>(Value::Null);
        assert!(issues[0].contains("sessionId"));
    }
}
