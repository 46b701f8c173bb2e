//! Post-action expectations checked against the fresh observation.

use std::collections::BTreeMap;

use bic_contract::{Observation, VerificationResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Caller predicates. All fields are optional; none supplied means trivially matched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Expectations {
    /// Case-sensitive substring of the final URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_opened: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_title_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_contains: Option<String>,
}

impl Expectations {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// `Some(true)` when a modal must be present, `Some(false)` when none may be,
    /// `Err(())` when the two modal predicates contradict each other.
    fn modal_presence(&self) -> Result<Option<bool>, ()> {
        match (self.modal_opened, self.modal_closed) {
            (Some(opened), Some(closed)) if opened == closed => Err(()),
            (Some(opened), _) => Ok(Some(opened)),
            (None, Some(closed)) => Ok(Some(!closed)),
            (None, None) => Ok(None),
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn delta(entries: impl IntoIterator<Item = (&'static str, Value)>) -> BTreeMap<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Evaluates predicates in a fixed order and stops at the first failure.
pub fn evaluate_expectations(
    expect: Option<&Expectations>,
    observation: &Observation,
) -> VerificationResult {
    let Some(expect) = expect.filter(|e| !e.is_empty()) else {
        return VerificationResult::matched("no expectations supplied");
    };
    let page = &observation.page;
    let modal_titles = || {
        json!(page
            .modals
            .iter()
            .map(|m| m.title.clone())
            .collect::<Vec<_>>())
    };

    if let Some(needle) = &expect.url_contains {
        if !page.final_url.contains(needle.as_str()) {
            return VerificationResult::mismatch(
                format!("urlContains: '{needle}' not found in URL"),
                delta([("url", json!(page.final_url))]),
            );
        }
    }

    if let Some(needle) = &expect.title_contains {
        let title = page.title.as_deref().unwrap_or_default();
        if !contains_ci(title, needle) {
            return VerificationResult::mismatch(
                format!("titleContains: '{needle}' not found in title"),
                delta([("title", json!(page.title))]),
            );
        }
    }

    if let Some(needle) = &expect.heading_contains {
        let heading = page.primary_heading.as_deref().unwrap_or_default();
        if !contains_ci(heading, needle) {
            return VerificationResult::mismatch(
                format!("headingContains: '{needle}' not found in primary heading"),
                delta([("primaryHeading", json!(page.primary_heading))]),
            );
        }
    }

    match expect.modal_presence() {
        Err(()) => {
            return VerificationResult::mismatch(
                "modalOpened/modalClosed: contradictory expectations",
                delta([("modalCount", json!(page.modals.len()))]),
            );
        }
        Ok(Some(true)) if page.modals.is_empty() => {
            return VerificationResult::mismatch(
                "modalOpened: no modal is open",
                delta([("modalCount", json!(0))]),
            );
        }
        Ok(Some(false)) if !page.modals.is_empty() => {
            return VerificationResult::mismatch(
                "modalClosed: a modal is still open",
                delta([
                    ("modalCount", json!(page.modals.len())),
                    ("modalTitles", modal_titles()),
                ]),
            );
        }
        Ok(_) => {}
    }

    if let Some(needle) = &expect.modal_title_contains {
        let hit = page
            .modals
            .iter()
            .filter_map(|m| m.title.as_deref())
            .any(|title| contains_ci(title, needle));
        if !hit {
            return VerificationResult::mismatch(
                format!("modalTitleContains: no modal title contains '{needle}'"),
                delta([("modalTitles", modal_titles())]),
            );
        }
    }

    if let Some(needle) = &expect.banner_contains {
        if !page.banners.iter().any(|b| contains_ci(&b.text, needle)) {
            let texts: Vec<&str> = page.banners.iter().map(|b| b.text.as_str()).collect();
            return VerificationResult::mismatch(
                format!("bannerContains: no banner contains '{needle}'"),
                delta([("banners", json!(texts))]),
            );
        }
    }

    VerificationResult::matched("all expectations matched")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bic_contract::{ObserveMode, ObserveScope, PageIdentity, SCHEMA_VERSION};
    use bic_core_types::{ObservationId, SessionId};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn observation(page: PageIdentity) -> Observation {
        Observation {
            schema_version: SCHEMA_VERSION.into(),
            observation_id: ObservationId::new(),
            session_id: SessionId::from("s"),
            created_at: Utc::now(),
            mode: ObserveMode::A11y,
            scope: ObserveScope::Document,
            page,
            affordances: vec![],
            forms: vec![],
            total_affordances: 0,
            has_more: false,
            next_cursor: None,
        }
    }

    #[test]
    fn url_mismatch_reports_observed_url() {
        let obs = observation(PageIdentity::from_url("https://example.com/login"));
        let result = evaluate_expectations(
            Some(&Expectations {
                url_contains: Some("checkout".into()),
                ..Expectations::default()
            }),
            &obs,
        );
        assert!(!result.matched);
        assert_eq!(
            result.observed_delta.get("url"),
            Some(&json!("https://example.com/login"))
        );
    }

    #[test]
    fn empty_expectations_match() {
        let obs = observation(PageIdentity::from_url("https://example.com/"));
        assert!(evaluate_expectations(None, &obs).matched);
        assert!(evaluate_expectations(Some(&Expectations::default()), &obs).matched);
        assert!(evaluate_expectations(None, &obs).observed_delta.is_empty());
    }

    #[test]
    fn title_and_heading_are_case_insensitive() {
        let obs = observation(
            PageIdentity::from_url("https://example.com/")
                .with_title("Order Confirmed")
                .with_heading("Thanks!"),
        );
        let result = evaluate_expectations(
            Some(&Expectations {
                title_contains: Some("order confirmed".into()),
                heading_contains: Some("THANKS".into()),
                ..Expectations::default()
            }),
            &obs,
        );
        assert!(result.matched, "{}", result.reason);
    }

    #[test]
    fn first_failure_wins() {
        let obs = observation(PageIdentity::from_url("https://example.com/").with_title("Home"));
        let result = evaluate_expectations(
            Some(&Expectations {
                title_contains: Some("cart".into()),
                banner_contains: Some("saved".into()),
                ..Expectations::default()
            }),
            &obs,
        );
        assert!(result.reason.starts_with("titleContains"));
        assert_eq!(result.observed_delta.len(), 1);
        assert_eq!(result.observed_delta["title"], json!("Home"));
    }

    #[test]
    fn modal_predicates() {
        let with_modal = observation(
            PageIdentity::from_url("https://example.com/").with_modal(Some("Confirm delete")),
        );
        let without = observation(PageIdentity::from_url("https://example.com/"));
        let opened = Expectations {
            modal_opened: Some(true),
            ..Expectations::default()
        };
        let closed = Expectations {
            modal_closed: Some(true),
            ..Expectations::default()
        };

        assert!(evaluate_expectations(Some(&opened), &with_modal).matched);
        let miss = evaluate_expectations(Some(&opened), &without);
        assert_eq!(miss.observed_delta["modalCount"], json!(0));

        assert!(evaluate_expectations(Some(&closed), &without).matched);
        let still_open = evaluate_expectations(Some(&closed), &with_modal);
        assert!(!still_open.matched);
        assert_eq!(still_open.observed_delta["modalTitles"], json!(["Confirm delete"]));

        let contradictory = Expectations {
            modal_opened: Some(true),
            modal_closed: Some(true),
            ..Expectations::default()
        };
        assert!(!evaluate_expectations(Some(&contradictory), &with_modal).matched);

        let titled = Expectations {
            modal_title_contains: Some("delete".into()),
            ..Expectations::default()
        };
        assert!(evaluate_expectations(Some(&titled), &with_modal).matched);
    }

    #[test]
    fn banner_mismatch_lists_banners() {
        let obs = observation(PageIdentity::from_url("https://example.com/").with_banner("Draft saved"));
        let result = evaluate_expectations(
            Some(&Expectations {
                banner_contains: Some("published".into()),
                ..Expectations::default()
            }),
            &obs,
        );
        assert_eq!(result.observed_delta["banners"], json!(["Draft saved"]));
    }
}
