use std::collections::BTreeMap;
use std::path::PathBuf;

use bic_contract::{ObserveMode, ObserveScope, PageIdentity};
use bic_core_types::FrameId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Roles that can become affordances. Everything else in the accessibility tree is context.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "textbox",
    "searchbox",
    "combobox",
    "listbox",
    "option",
    "checkbox",
    "radio",
    "switch",
    "slider",
    "spinbutton",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "tab",
    "treeitem",
];

pub fn is_interactive_role(role: &str) -> bool {
    INTERACTIVE_ROLES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(role))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub mode: ObserveMode,
    pub scope: ObserveScope,
    pub include_hidden: bool,
    pub include_disabled: bool,
}

impl Default for SnapshotRequest {
    fn default() -> Self {
        Self {
            mode: ObserveMode::A11y,
            scope: ObserveScope::Document,
            include_hidden: false,
            include_disabled: true,
        }
    }
}

/// One accessibility-tree node as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAxNode {
    pub node_id: String,
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub backend_dom_node_id: Option<i64>,
    #[serde(default)]
    pub ignored: bool,
}

/// Description of the DOM node backing an accessibility node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDomNode {
    pub backend_node_id: i64,
    pub node_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl RawDomNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn tag(&self) -> String {
        self.node_name.to_ascii_lowercase()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    pub page: PageIdentity,
    #[serde(default)]
    pub ax_nodes: Vec<RawAxNode>,
    #[serde(default)]
    pub dom_nodes: Vec<RawDomNode>,
    /// `dom_nodes` holds only the described interactive elements, so selector uniqueness
    /// has to come from the page-side `data-bic-unique` marker.
    #[serde(default)]
    pub partial_dom: bool,
}

impl RawSnapshot {
    pub fn new(page: PageIdentity) -> Self {
        Self {
            page,
            ax_nodes: Vec::new(),
            dom_nodes: Vec::new(),
            partial_dom: false,
        }
    }

    /// Appends an accessibility node with a backing DOM element. Intended for fixtures.
    pub fn with_element(
        mut self,
        role: &str,
        name: &str,
        node_name: &str,
        attributes: &[(&str, &str)],
    ) -> Self {
        let backend_node_id = self.dom_nodes.len() as i64 + 1;
        self.ax_nodes.push(RawAxNode {
            node_id: format!("ax-{backend_node_id}"),
            role: role.to_string(),
            name: name.to_string(),
            backend_dom_node_id: Some(backend_node_id),
            ignored: false,
        });
        self.dom_nodes.push(RawDomNode {
            backend_node_id,
            node_name: node_name.to_ascii_uppercase(),
            attributes: attributes
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTarget {
    pub selector: String,
    /// The selector is not known to match exactly one element.
    pub best_effort: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

/// Where a driver action lands: the page itself or a resolved element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriverTarget {
    Page,
    Element(ElementTarget),
}

impl DriverTarget {
    pub fn element(selector: impl Into<String>, best_effort: bool) -> Self {
        DriverTarget::Element(ElementTarget {
            selector: selector.into(),
            best_effort,
            frame_id: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum DriverAction {
    Click,
    Fill { value: String },
    Navigate { url: String },
    Evaluate { expression: String },
}

impl DriverAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            DriverAction::Click => "click",
            DriverAction::Fill { .. } => "fill",
            DriverAction::Navigate { .. } => "navigate",
            DriverAction::Evaluate { .. } => "evaluate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActRequest {
    pub target: DriverTarget,
    pub action: DriverAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadState {
    InProgress,
    Completed,
    Canceled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub guid: String,
    pub url: String,
    pub suggested_filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub state: DownloadState,
}

/// Per-session launch parameters supplied by whoever opens the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOptions {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_mo_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_state_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_use_type_tag() {
        let action: DriverAction =
            serde_json::from_value(json!({ "type": "fill", "value": "alice" })).unwrap();
        assert_eq!(
            action,
            DriverAction::Fill {
                value: "alice".into()
            }
        );
        assert_eq!(action.action_type(), "fill");
        assert!(serde_json::from_value::<DriverAction>(json!({ "type": "hover" })).is_err());
    }

    #[test]
    fn fixture_builder_links_ax_and_dom_nodes() {
        let snapshot = RawSnapshot::new(PageIdentity::from_url("https://example.com/"))
            .with_element("button", "Go", "button", &[("id", "go")])
            .with_element("link", "Home", "a", &[("href", "/")]);
        assert_eq!(snapshot.ax_nodes[1].backend_dom_node_id, Some(2));
        assert_eq!(snapshot.dom_nodes[1].tag(), "a");
        assert_eq!(snapshot.dom_nodes[0].attr("id"), Some("go"));
    }

    #[test]
    fn interactive_roles_match_case_insensitively() {
        assert!(is_interactive_role("Button"));
        assert!(!is_interactive_role("StaticText"));
    }
}
