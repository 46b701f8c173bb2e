//! Candidate extraction: joins accessibility nodes with their backing DOM descriptions.

use std::collections::HashMap;

use bic_browser_driver::{is_interactive_role, DriverTarget, RawDomNode, RawSnapshot};
use bic_contract::{
    Affordance, Constraints, Fingerprint, FingerprintKind, Landmark, Risk,
};
use bic_core_types::{ActionId, FrameId};

use crate::risk::classify_risk;
use crate::selector::SelectorIndex;

pub const LANDMARK_ATTR: &str = "data-bic-landmark";
pub const NEAR_TEXT_ATTR: &str = "data-bic-near-text";
pub const SENSITIVE_ATTR: &str = "data-bic-sensitive";
pub const FRAME_ATTR: &str = "data-bic-frame-id";
/// Space-separated selector kinds (`id`, `name`, `href`, `data-testid`) that the page found
/// to match exactly one element of the owning document.
pub const UNIQUE_ATTR: &str = "data-bic-unique";
/// Live `.value` of a form control, which the `value` attribute stops tracking after input.
pub const VALUE_ATTR: &str = "data-bic-value";

const SENSITIVE_AUTOCOMPLETE: &[&str] = &["current-password", "new-password", "one-time-code"];

/// An interactive element before pagination has given it an action id.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub role: String,
    pub name: String,
    pub visible: bool,
    pub disabled: bool,
    pub risk: Risk,
    pub landmark: Landmark,
    pub href: Option<String>,
    pub required: Option<bool>,
    pub constraints: Constraints,
    pub value: Option<String>,
    pub sensitive: bool,
    pub frame_id: Option<FrameId>,
    pub near_text: Option<String>,
    pub fingerprint: Fingerprint,
    pub target: DriverTarget,
}

impl Candidate {
    pub fn into_parts(self, action_id: ActionId) -> (Affordance, DriverTarget) {
        let affordance = Affordance {
            action_id,
            role: self.role,
            name: self.name,
            visible: self.visible,
            disabled: self.disabled,
            risk: self.risk,
            landmark: self.landmark,
            href: self.href,
            required: self.required,
            constraints: self.constraints,
            value: self.value,
            value_redacted: None,
            sensitive: self.sensitive.then_some(true),
            frame_id: self.frame_id,
            near_text: self.near_text,
            fingerprint: self.fingerprint,
        };
        (affordance, self.target)
    }
}

/// Builds one candidate per interactive accessibility node that has a described DOM node.
pub fn extract_candidates(snapshot: &RawSnapshot) -> Vec<Candidate> {
    let dom: HashMap<i64, &RawDomNode> = snapshot
        .dom_nodes
        .iter()
        .map(|node| (node.backend_node_id, node))
        .collect();
    let index = SelectorIndex::for_snapshot(snapshot);

    snapshot
        .ax_nodes
        .iter()
        .filter(|node| !node.ignored && is_interactive_role(&node.role))
        .filter_map(|node| {
            let element = dom.get(&node.backend_dom_node_id?)?;
            Some(candidate(
                &node.role.to_ascii_lowercase(),
                node.name.trim(),
                element,
                &index,
            ))
        })
        .collect()
}

fn candidate(role: &str, name: &str, node: &RawDomNode, index: &SelectorIndex) -> Candidate {
    let flag = |plain: &str, aria: &str| node.has_attr(plain) || node.attr(aria) == Some("true");

    let visible = !node.has_attr("hidden") && node.attr("aria-hidden") != Some("true");
    let disabled = flag("disabled", "aria-disabled");
    let required = flag("required", "aria-required").then_some(true);

    let landmark = node
        .attr(LANDMARK_ATTR)
        .map(Landmark::parse)
        .unwrap_or_default();
    let near_text = non_empty(node.attr(NEAR_TEXT_ATTR));
    let frame_id = non_empty(node.attr(FRAME_ATTR)).map(FrameId::from);
    let dom_id = non_empty(node.attr("id"));

    let fingerprint = match &dom_id {
        Some(id) => Fingerprint {
            kind: FingerprintKind::DomId,
            value: id.clone(),
        },
        None => Fingerprint {
            kind: FingerprintKind::RoleName,
            value: format!("{role}|{name}|{}", landmark.as_str()),
        },
    };

    Candidate {
        role: role.to_string(),
        name: name.to_string(),
        visible,
        disabled,
        risk: classify_risk(role, name, near_text.as_deref()),
        landmark,
        href: non_empty(node.attr("href")),
        required,
        constraints: constraints(node),
        value: node
            .attr(VALUE_ATTR)
            .or_else(|| node.attr("value"))
            .map(str::to_string),
        sensitive: is_sensitive(node),
        target: index.target_for(node, frame_id.clone()),
        frame_id,
        near_text,
        fingerprint,
    }
}

fn constraints(node: &RawDomNode) -> Constraints {
    let length = |attr: &str| node.attr(attr).and_then(|raw| raw.trim().parse::<u32>().ok());
    Constraints {
        input_type: non_empty(node.attr("type")).map(|t| t.to_ascii_lowercase()),
        pattern: non_empty(node.attr("pattern")),
        min_length: length("minlength"),
        max_length: length("maxlength"),
    }
}

pub fn is_sensitive(node: &RawDomNode) -> bool {
    if node.has_attr(SENSITIVE_ATTR) {
        return true;
    }
    if node
        .attr("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("password"))
    {
        return true;
    }
    node.attr("autocomplete").is_some_and(|raw| {
        raw.split_whitespace().any(|token| {
            let token = token.to_ascii_lowercase();
            token.starts_with("cc-") || SENSITIVE_AUTOCOMPLETE.contains(&token.as_str())
        })
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bic_browser_driver::RawAxNode;
    use bic_contract::PageIdentity;
    use pretty_assertions::assert_eq;

    fn page() -> RawSnapshot {
        RawSnapshot::new(PageIdentity::from_url("https://example.com/login"))
    }

    #[test]
    fn resolves_attributes_into_candidate() {
        let snapshot = page().with_element(
            "textbox",
            " Email ",
            "input",
            &[
                ("id", "email"),
                ("type", "email"),
                ("required", ""),
                ("maxlength", "64"),
                ("value", "a@b.c"),
                (LANDMARK_ATTR, "main"),
                (NEAR_TEXT_ATTR, "Sign in"),
            ],
        );
        let candidates = extract_candidates(&snapshot);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.name, "Email");
        assert_eq!(c.landmark, Landmark::Main);
        assert_eq!(c.required, Some(true));
        assert_eq!(c.constraints.input_type.as_deref(), Some("email"));
        assert_eq!(c.constraints.max_length, Some(64));
        assert_eq!(c.value.as_deref(), Some("a@b.c"));
        assert_eq!(c.fingerprint.kind, FingerprintKind::DomId);
        assert_eq!(c.target, DriverTarget::element("#email", false));
        assert!(!c.sensitive);
    }

    #[test]
    fn hidden_disabled_and_sensitive_flags() {
        let snapshot = page()
            .with_element("textbox", "Password", "input", &[("type", "password")])
            .with_element("button", "Go", "button", &[("aria-disabled", "true"), ("aria-hidden", "true")])
            .with_element("textbox", "Card", "input", &[("autocomplete", "billing cc-number")]);
        let candidates = extract_candidates(&snapshot);
        assert!(candidates[0].sensitive);
        assert!(!candidates[1].visible);
        assert!(candidates[1].disabled);
        assert!(candidates[2].sensitive);
        assert_eq!(candidates[1].fingerprint.value, "button|Go|unknown");
    }

    #[test]
    fn live_value_and_frame_markers_win() {
        let snapshot = page().with_element(
            "textbox",
            "Search",
            "input",
            &[
                ("name", "q"),
                ("value", "initial"),
                (VALUE_ATTR, "typed later"),
                (FRAME_ATTR, "checkout"),
            ],
        );
        let c = &extract_candidates(&snapshot)[0];
        assert_eq!(c.value.as_deref(), Some("typed later"));
        assert_eq!(c.frame_id, Some(FrameId::from("checkout")));
        match &c.target {
            DriverTarget::Element(el) => {
                assert_eq!(el.frame_id, Some(FrameId::from("checkout")));
                assert_eq!(el.selector, r#"input[name="q"]"#);
            }
            DriverTarget::Page => panic!("expected element target"),
        }
    }

    #[test]
    fn drops_nodes_without_backing_dom_or_interactive_role() {
        let mut snapshot = page()
            .with_element("button", "Keep", "button", &[])
            .with_element("heading", "Title", "h1", &[]);
        snapshot.ax_nodes.push(RawAxNode {
            node_id: "orphan".into(),
            role: "button".into(),
            name: "Orphan".into(),
            backend_dom_node_id: None,
            ignored: false,
        });
        snapshot.ax_nodes.push(RawAxNode {
            node_id: "dangling".into(),
            role: "link".into(),
            name: "Dangling".into(),
            backend_dom_node_id: Some(999),
            ignored: false,
        });
        let names: Vec<_> = extract_candidates(&snapshot)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Keep".to_string()]);
    }
}
