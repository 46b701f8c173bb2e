//! Wire model for BIC documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bic_core_types::{ActionId, FrameId, ObservationId, SessionId};

pub const SCHEMA_VERSION: &str = "0.1";

pub const MIN_AFFORDANCES: usize = 1;
pub const MAX_AFFORDANCES: usize = 200;
pub const DEFAULT_MAX_AFFORDANCES: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Safe,
    Caution,
    Danger,
}

impl Default for Risk {
    fn default() -> Self {
        Risk::Safe
    }
}

impl Risk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::Safe => "safe",
            Risk::Caution => "caution",
            Risk::Danger => "danger",
        }
    }
}

/// Coarse page region an affordance lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Landmark {
    Main,
    Nav,
    Footer,
    Modal,
    Banner,
    Unknown,
}

impl Default for Landmark {
    fn default() -> Self {
        Landmark::Unknown
    }
}

impl Landmark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Landmark::Main => "main",
            Landmark::Nav => "nav",
            Landmark::Footer => "footer",
            Landmark::Modal => "modal",
            Landmark::Banner => "banner",
            Landmark::Unknown => "unknown",
        }
    }

    /// Lenient parse used for driver-supplied markers; anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "main" => Landmark::Main,
            "nav" | "navigation" => Landmark::Nav,
            "footer" | "contentinfo" => Landmark::Footer,
            "modal" | "dialog" | "alertdialog" => Landmark::Modal,
            "banner" | "header" => Landmark::Banner,
            _ => Landmark::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LoadState {
    Loading,
    Interactive,
    NetworkIdle,
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::Interactive
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ObserveMode {
    #[serde(rename = "a11y")]
    A11y,
}

impl Default for ObserveMode {
    fn default() -> Self {
        ObserveMode::A11y
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ObserveScope {
    Viewport,
    Document,
    Modal,
}

impl Default for ObserveScope {
    fn default() -> Self {
        ObserveScope::Document
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingOverlay {
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockerKind {
    CookieConsent,
    LoginWall,
    Captcha,
    Paywall,
    Overlay,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub kind: BlockerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Identity and blocking state of the page an observation was taken from.
///
/// `url` is the address the session last asked for; `final_url` is where the page actually
/// landed. Both are always present, even when identical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIdentity {
    pub domain: String,
    pub url: String,
    pub final_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_key: Option<String>,
    pub load_state: LoadState,
    #[serde(default)]
    pub blocking_overlay: BlockingOverlay,
    #[serde(default)]
    pub blockers: Vec<Blocker>,
    #[serde(default)]
    pub banners: Vec<Banner>,
    #[serde(default)]
    pub modals: Vec<Modal>,
    #[serde(default)]
    pub frames: Vec<FrameInfo>,
}

impl PageIdentity {
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            domain: domain_of(&url),
            final_url: url.clone(),
            url,
            lang: None,
            title: None,
            primary_heading: None,
            route_key: None,
            load_state: LoadState::default(),
            blocking_overlay: BlockingOverlay::default(),
            blockers: Vec::new(),
            banners: Vec::new(),
            modals: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.primary_heading = Some(heading.into());
        self
    }

    pub fn with_modal(mut self, title: Option<&str>) -> Self {
        self.modals.push(Modal {
            title: title.map(str::to_string),
        });
        self
    }

    pub fn with_banner(mut self, text: impl Into<String>) -> Self {
        self.banners.push(Banner { text: text.into() });
        self
    }

    /// Points the identity at a new address, keeping `url`, `final_url` and `domain` in step.
    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
        self.final_url = url.to_string();
        self.domain = domain_of(url);
    }
}

/// Host portion of a URL, or an empty string when the URL has none.
pub fn domain_of(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.input_type.is_none()
            && self.pattern.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintKind {
    DomId,
    RoleName,
}

/// Correlates the same logical element across observations, independent of action ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub kind: FingerprintKind,
    pub value: String,
}

/// One interactive element exposed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affordance {
    pub action_id: ActionId,
    pub role: String,
    pub name: String,
    pub visible: bool,
    pub disabled: bool,
    pub risk: Risk,
    pub landmark: Landmark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_redacted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near_text: Option<String>,
    pub fingerprint: Fingerprint,
}

impl Affordance {
    pub fn is_sensitive(&self) -> bool {
        self.sensitive.unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldRef {
    pub action_id: ActionId,
}

/// Coarse form grouping. Field data lives on the referenced affordances only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub fields: Vec<FormFieldRef>,
}

/// Root BIC document returned by every observe (and by act as `nextObservation`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub schema_version: String,
    pub observation_id: ObservationId,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub mode: ObserveMode,
    pub scope: ObserveScope,
    pub page: PageIdentity,
    pub affordances: Vec<Affordance>,
    pub forms: Vec<Form>,
    pub total_affordances: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl Observation {
    pub fn affordance(&self, action_id: &ActionId) -> Option<&Affordance> {
        self.affordances
            .iter()
            .find(|affordance| &affordance.action_id == action_id)
    }
}

/// Outcome of checking caller expectations against a fresh observation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub matched: bool,
    pub reason: String,
    #[serde(default)]
    pub observed_delta: BTreeMap<String, Value>,
}

impl VerificationResult {
    pub fn matched(reason: impl Into<String>) -> Self {
        Self {
            matched: true,
            reason: reason.into(),
            observed_delta: BTreeMap::new(),
        }
    }

    pub fn mismatch(reason: impl Into<String>, delta: BTreeMap<String, Value>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
            observed_delta: delta,
        }
    }
}
