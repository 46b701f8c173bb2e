//! Danger-intent classification.
//!
//! Over-gating is preferred: a false `danger` costs one confirmation round trip, a false
//! `safe` can dispatch a destructive action unconfirmed.

use bic_contract::Risk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Word-initial stems: "pay" also catches "payment", "delet" catches "deleting".
pub const DANGER_STEMS: &[&str] = &[
    "pay",
    "place order",
    "submit payment",
    "confirm",
    "delet",
    "remov",
    "publish",
    "merg",
    "refund",
];

static DANGER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternatives = DANGER_STEMS
        .iter()
        .map(|phrase| regex::escape(phrase).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternatives})")).expect("danger stems form a valid pattern")
});

/// Classifies an element by its accessible name and nearby text.
///
/// The role is accepted for signature stability; current policy is text-only.
pub fn classify_risk(_role: &str, name: &str, near_text: Option<&str>) -> Risk {
    let hit = |text: &str| DANGER_PATTERN.is_match(&text.to_lowercase());
    if hit(name) || near_text.is_some_and(hit) {
        Risk::Danger
    } else {
        Risk::Safe
    }
}
