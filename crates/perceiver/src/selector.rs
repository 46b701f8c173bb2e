//! Selector synthesis for action targets.

use std::collections::HashMap;

use bic_browser_driver::{DriverTarget, ElementTarget, RawDomNode, RawSnapshot};
use bic_core_types::FrameId;

use crate::extract::UNIQUE_ATTR;

/// Attribute frequencies across one snapshot, used to decide which selectors are unique.
#[derive(Debug, Default)]
pub struct SelectorIndex {
    ids: HashMap<String, usize>,
    tag_attr: HashMap<(String, &'static str, String), usize>,
    /// Counts only cover part of the document; a selector also needs the page's verdict.
    require_marker: bool,
}

const UNIQUE_ATTRS: &[(&str, &str)] = &[("*", "name"), ("a", "href"), ("*", "data-testid")];

impl SelectorIndex {
    pub fn for_snapshot(snapshot: &RawSnapshot) -> Self {
        Self {
            require_marker: snapshot.partial_dom,
            ..Self::build(&snapshot.dom_nodes)
        }
    }

    pub fn build(nodes: &[RawDomNode]) -> Self {
        let mut index = Self::default();
        for node in nodes {
            if let Some(id) = node.attr("id").filter(|id| !id.is_empty()) {
                *index.ids.entry(id.to_string()).or_default() += 1;
            }
            let tag = node.tag();
            for (_, attr) in UNIQUE_ATTRS {
                if let Some(value) = node.attr(attr).filter(|value| !value.is_empty()) {
                    *index
                        .tag_attr
                        .entry((tag.clone(), *attr, value.to_string()))
                        .or_default() += 1;
                }
            }
        }
        index
    }

    /// Prefers a unique id, then a unique tag+attribute pair, and finally falls back to the
    /// bare tag flagged as best effort.
    pub fn target_for(&self, node: &RawDomNode, frame_id: Option<FrameId>) -> DriverTarget {
        let (selector, best_effort) = self.selector_for(node);
        DriverTarget::Element(ElementTarget {
            selector,
            best_effort,
            frame_id,
        })
    }

    fn selector_for(&self, node: &RawDomNode) -> (String, bool) {
        if let Some(id) = node.attr("id").filter(|id| !id.is_empty()) {
            if self.ids.get(id) == Some(&1) && self.verified(node, "id") {
                return (id_selector(id), false);
            }
        }

        let tag = node.tag();
        for (scope, attr) in UNIQUE_ATTRS {
            if *scope != "*" && *scope != tag {
                continue;
            }
            let Some(value) = node.attr(attr).filter(|value| !value.is_empty()) else {
                continue;
            };
            if self.tag_attr.get(&(tag.clone(), *attr, value.to_string())) == Some(&1)
                && self.verified(node, attr)
            {
                return (format!("{tag}[{attr}=\"{}\"]", escape_attr(value)), false);
            }
        }

        (tag, true)
    }

    /// Whether the page confirmed that `kind` matches exactly one element in its document.
    fn verified(&self, node: &RawDomNode, kind: &str) -> bool {
        if !self.require_marker {
            return true;
        }
        node.attr(UNIQUE_ATTR)
            .is_some_and(|kinds| kinds.split_whitespace().any(|k| k == kind))
    }
}

fn id_selector(id: &str) -> String {
    let plain = id.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        format!("#{id}")
    } else {
        format!("[id=\"{}\"]", escape_attr(id))
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
