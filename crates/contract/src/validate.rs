//! Structural validation of BIC documents.
//!
//! Works on raw JSON so the same checks apply to documents we produced and to documents
//! received from another process. Only shape is checked: presence, JSON type and enum
//! membership, plus the redaction invariant on sensitive affordances.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Observation, SCHEMA_VERSION};

const RISKS: &[&str] = &["safe", "caution", "danger"];
const LANDMARKS: &[&str] = &["main", "nav", "footer", "modal", "banner", "unknown"];
const LOAD_STATES: &[&str] = &["loading", "interactive", "network-idle"];
const SCOPES: &[&str] = &["viewport", "document", "modal"];
const MODES: &[&str] = &["a11y"];
const BLOCKER_KINDS: &[&str] = &[
    "cookie-consent",
    "login-wall",
    "captcha",
    "paywall",
    "overlay",
    "other",
];
const FINGERPRINT_KINDS: &[&str] = &["dom-id", "role-name"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("document failed structural validation ({} issue(s))", issues.len())]
pub struct ContractViolation {
    pub issues: Vec<ValidationIssue>,
}

impl ContractViolation {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

#[derive(Default)]
struct Checker {
    issues: Vec<ValidationIssue>,
}

impl Checker {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.push(path, "expected object");
        }
        map
    }

    fn string(&mut self, map: &Map<String, Value>, key: &str, path: &str) {
        match map.get(key) {
            Some(Value::String(_)) => {}
            Some(_) => self.push(&join(path, key), "expected string"),
            None => self.push(&join(path, key), "missing required field"),
        }
    }

    fn opt_string(&mut self, map: &Map<String, Value>, key: &str, path: &str) {
        match map.get(key) {
            None | Some(Value::String(_)) => {}
            Some(_) => self.push(&join(path, key), "expected string"),
        }
    }

    fn boolean(&mut self, map: &Map<String, Value>, key: &str, path: &str) {
        match map.get(key) {
            Some(Value::Bool(_)) => {}
            Some(_) => self.push(&join(path, key), "expected boolean"),
            None => self.push(&join(path, key), "missing required field"),
        }
    }

    fn opt_bool(&mut self, map: &Map<String, Value>, key: &str, path: &str) {
        match map.get(key) {
            None | Some(Value::Bool(_)) => {}
            Some(_) => self.push(&join(path, key), "expected boolean"),
        }
    }

    fn opt_uint(&mut self, map: &Map<String, Value>, key: &str, path: &str) {
        match map.get(key) {
            None => {}
            Some(value) if value.as_u64().is_some() => {}
            Some(_) => self.push(&join(path, key), "expected non-negative integer"),
        }
    }

    fn one_of(&mut self, map: &Map<String, Value>, key: &str, path: &str, allowed: &[&str]) {
        match map.get(key).and_then(Value::as_str) {
            Some(raw) if allowed.contains(&raw) => {}
            Some(raw) => self.push(
                &join(path, key),
                format!("'{raw}' is not one of {}", allowed.join("|")),
            ),
            None => self.push(&join(path, key), "missing or non-string enum field"),
        }
    }

    fn array<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v Vec<Value>> {
        match map.get(key) {
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.push(&join(path, key), "expected array");
                None
            }
            None => {
                self.push(&join(path, key), "missing required field");
                None
            }
        }
    }

    fn finish(self) -> Result<(), ContractViolation> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ContractViolation {
                issues: self.issues,
            })
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Validates a full observation document.
pub fn validate_observation(value: &Value) -> Result<(), ContractViolation> {
    let mut checker = Checker::default();
    check_observation(&mut checker, value, "");
    checker.finish()
}

pub fn validate_page(value: &Value) -> Result<(), ContractViolation> {
    let mut checker = Checker::default();
    check_page(&mut checker, value, "page");
    checker.finish()
}

pub fn validate_affordance(value: &Value) -> Result<(), ContractViolation> {
    let mut checker = Checker::default();
    check_affordance(&mut checker, value, "affordance");
    checker.finish()
}

pub fn validate_verification(value: &Value) -> Result<(), ContractViolation> {
    let mut checker = Checker::default();
    if let Some(map) = checker.object(value, "verification") {
        checker.boolean(map, "matched", "verification");
        checker.string(map, "reason", "verification");
        match map.get("observedDelta") {
            Some(Value::Object(_)) => {}
            Some(_) => checker.push("verification.observedDelta", "expected object"),
            None => checker.push("verification.observedDelta", "missing required field"),
        }
    }
    checker.finish()
}

/// Validates and decodes a document received across a process boundary.
pub fn parse_observation(value: Value) -> Result<Observation, ContractViolation> {
    validate_observation(&value)?;
    serde_json::from_value(value).map_err(|err| ContractViolation {
        issues: vec![ValidationIssue {
            path: String::new(),
            message: err.to_string(),
        }],
    })
}

fn check_observation(checker: &mut Checker, value: &Value, path: &str) {
    let Some(map) = checker.object(value, if path.is_empty() { "$" } else { path }) else {
        return;
    };

    match map.get("schemaVersion").and_then(Value::as_str) {
        Some(SCHEMA_VERSION) => {}
        Some(other) => checker.push(
            &join(path, "schemaVersion"),
            format!("unsupported schema version '{other}'"),
        ),
        None => checker.push(&join(path, "schemaVersion"), "missing required field"),
    }
    checker.string(map, "observationId", path);
    checker.string(map, "sessionId", path);
    checker.string(map, "createdAt", path);
    checker.one_of(map, "mode", path, MODES);
    checker.one_of(map, "scope", path, SCOPES);
    checker.boolean(map, "hasMore", path);
    checker.opt_string(map, "nextCursor", path);
    checker.opt_uint(map, "totalAffordances", path);

    match map.get("page") {
        Some(page) => check_page(checker, page, &join(path, "page")),
        None => checker.push(&join(path, "page"), "missing required field"),
    }

    if let Some(items) = checker.array(map, "affordances", path) {
        for (idx, item) in items.iter().enumerate() {
            check_affordance(checker, item, &format!("{}[{idx}]", join(path, "affordances")));
        }
    }

    if let Some(forms) = checker.array(map, "forms", path) {
        for (idx, form) in forms.iter().enumerate() {
            let form_path = format!("{}[{idx}]", join(path, "forms"));
            let Some(form_map) = checker.object(form, &form_path) else {
                continue;
            };
            checker.opt_string(form_map, "section", &form_path);
            if let Some(fields) = checker.array(form_map, "fields", &form_path) {
                for (fidx, field) in fields.iter().enumerate() {
                    let field_path = format!("{}[{fidx}]", join(&form_path, "fields"));
                    if let Some(field_map) = checker.object(field, &field_path) {
                        checker.string(field_map, "actionId", &field_path);
                    }
                }
            }
        }
    }
}

fn check_page(checker: &mut Checker, value: &Value, path: &str) {
    let Some(map) = checker.object(value, path) else {
        return;
    };
    checker.string(map, "domain", path);
    checker.string(map, "url", path);
    checker.string(map, "finalUrl", path);
    for key in ["lang", "title", "primaryHeading", "routeKey"] {
        checker.opt_string(map, key, path);
    }
    checker.one_of(map, "loadState", path, LOAD_STATES);

    let overlay_path = join(path, "blockingOverlay");
    match map.get("blockingOverlay") {
        Some(overlay) => {
            if let Some(overlay_map) = checker.object(overlay, &overlay_path) {
                checker.boolean(overlay_map, "present", &overlay_path);
                checker.opt_string(overlay_map, "label", &overlay_path);
            }
        }
        None => checker.push(&overlay_path, "missing required field"),
    }

    if let Some(blockers) = checker.array(map, "blockers", path) {
        for (idx, blocker) in blockers.iter().enumerate() {
            let item_path = format!("{}[{idx}]", join(path, "blockers"));
            if let Some(item) = checker.object(blocker, &item_path) {
                checker.one_of(item, "kind", &item_path, BLOCKER_KINDS);
                checker.opt_string(item, "label", &item_path);
            }
        }
    }
    if let Some(banners) = checker.array(map, "banners", path) {
        for (idx, banner) in banners.iter().enumerate() {
            let item_path = format!("{}[{idx}]", join(path, "banners"));
            if let Some(item) = checker.object(banner, &item_path) {
                checker.string(item, "text", &item_path);
            }
        }
    }
    if let Some(modals) = checker.array(map, "modals", path) {
        for (idx, modal) in modals.iter().enumerate() {
            let item_path = format!("{}[{idx}]", join(path, "modals"));
            if let Some(item) = checker.object(modal, &item_path) {
                checker.opt_string(item, "title", &item_path);
            }
        }
    }
    if let Some(frames) = checker.array(map, "frames", path) {
        for (idx, frame) in frames.iter().enumerate() {
            let item_path = format!("{}[{idx}]", join(path, "frames"));
            if let Some(item) = checker.object(frame, &item_path) {
                checker.string(item, "frameId", &item_path);
                checker.string(item, "url", &item_path);
                checker.opt_string(item, "name", &item_path);
            }
        }
    }
}

fn check_affordance(checker: &mut Checker, value: &Value, path: &str) {
    let Some(map) = checker.object(value, path) else {
        return;
    };
    checker.string(map, "actionId", path);
    checker.string(map, "role", path);
    checker.string(map, "name", path);
    checker.boolean(map, "visible", path);
    checker.boolean(map, "disabled", path);
    checker.one_of(map, "risk", path, RISKS);
    checker.one_of(map, "landmark", path, LANDMARKS);
    checker.opt_string(map, "href", path);
    checker.opt_bool(map, "required", path);
    checker.opt_string(map, "value", path);
    checker.opt_bool(map, "valueRedacted", path);
    checker.opt_bool(map, "sensitive", path);
    checker.opt_string(map, "frameId", path);
    checker.opt_string(map, "nearText", path);

    if let Some(constraints) = map.get("constraints") {
        let constraints_path = join(path, "constraints");
        if let Some(c) = checker.object(constraints, &constraints_path) {
            checker.opt_string(c, "type", &constraints_path);
            checker.opt_string(c, "pattern", &constraints_path);
            checker.opt_uint(c, "minLength", &constraints_path);
            checker.opt_uint(c, "maxLength", &constraints_path);
        }
    }

    let fingerprint_path = join(path, "fingerprint");
    match map.get("fingerprint") {
        Some(fingerprint) => {
            if let Some(fp) = checker.object(fingerprint, &fingerprint_path) {
                checker.one_of(fp, "kind", &fingerprint_path, FINGERPRINT_KINDS);
                checker.string(fp, "value", &fingerprint_path);
            }
        }
        None => checker.push(&fingerprint_path, "missing required field"),
    }

    if map.get("sensitive").and_then(Value::as_bool) == Some(true) {
        if map.contains_key("value") {
            checker.push(&join(path, "value"), "sensitive affordance must not carry a value");
        }
        if map.get("valueRedacted").and_then(Value::as_bool) != Some(true) {
            checker.push(
                &join(path, "valueRedacted"),
                "sensitive affordance must be marked valueRedacted",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_observation() -> Value {
        json!({
            "schemaVersion": "0.1",
            "observationId": "obs_1",
            "sessionId": "s-1",
            "createdAt": "2024-01-01T00:00:00Z",
            "mode": "a11y",
            "scope": "document",
            "page": {
                "domain": "example.com",
                "url": "https://example.com/",
                "finalUrl": "https://example.com/",
                "loadState": "interactive",
                "blockingOverlay": { "present": false },
                "blockers": [],
                "banners": [],
                "modals": [],
                "frames": []
            },
            "affordances": [{
                "actionId": "a_1",
                "role": "button",
                "name": "Sign in",
                "visible": true,
                "disabled": false,
                "risk": "safe",
                "landmark": "main",
                "fingerprint": { "kind": "dom-id", "value": "signin" }
            }],
            "forms": [],
            "totalAffordances": 1,
            "hasMore": false
        })
    }

    #[test]
    fn accepts_well_formed_observation() {
        assert!(validate_observation(&minimal_observation()).is_ok());
        let parsed = parse_observation(minimal_observation()).expect("decodes");
        assert_eq!(parsed.affordances.len(), 1);
    }

    #[test]
    fn reports_missing_and_mistyped_fields() {
        let mut doc = minimal_observation();
        doc["page"].as_object_mut().unwrap().remove("finalUrl");
        doc["affordances"][0]["risk"] = json!("deadly");
        doc["hasMore"] = json!("no");

        let err = validate_observation(&doc).unwrap_err();
        let messages = err.messages();
        assert!(messages.iter().any(|m| m.starts_with("page.finalUrl")));
        assert!(messages.iter().any(|m| m.starts_with("affordances[0].risk")));
        assert!(messages.iter().any(|m| m.starts_with("hasMore")));
    }

    #[test]
    fn rejects_sensitive_affordance_with_value() {
        let mut doc = minimal_observation();
        doc["affordances"][0]["sensitive"] = json!(true);
        doc["affordances"][0]["value"] = json!("hunter2");

        let err = validate_observation(&doc).unwrap_err();
        let messages = err.messages();
        assert!(messages.iter().any(|m| m.contains("must not carry a value")));
        assert!(messages.iter().any(|m| m.contains("valueRedacted")));
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut doc = minimal_observation();
        doc["schemaVersion"] = json!("9.9");
        assert!(validate_observation(&doc).is_err());
    }

    #[test]
    fn verification_shape_is_checked() {
        assert!(validate_verification(&json!({
            "matched": false,
            "reason": "urlContains",
            "observedDelta": { "url": "https://example.com/login" }
        }))
        .is_ok());
        assert!(validate_verification(&json!({ "matched": true })).is_err());
    }
}
