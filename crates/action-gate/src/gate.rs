//! Confirmation gate for danger-risk actions.

use bic_contract::{BicError, BicResult};
use tracing::warn;

/// Domain used in the confirmation text when the page identity has none.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// `CONFIRM <actionType> '<label-or-actionId>' on <domain>`
pub fn required_confirmation_text(action_type: &str, label: &str, domain: &str) -> String {
    let domain = if domain.trim().is_empty() {
        UNKNOWN_DOMAIN
    } else {
        domain
    };
    format!("CONFIRM {action_type} '{label}' on {domain}")
}

/// Passes only when `confirm` is true and the trimmed text equals `required` exactly.
pub fn enforce_safety(
    required: &str,
    confirm: Option<bool>,
    confirmation_text: Option<&str>,
) -> BicResult<()> {
    let confirmed = confirm == Some(true);
    let text_matches = confirmation_text.map(str::trim) == Some(required);
    if confirmed && text_matches {
        return Ok(());
    }

    warn!(
        confirmed,
        text_supplied = confirmation_text.is_some(),
        required = %required,
        "safety gate rejected action"
    );
    Err(BicError::SafetyConfirmationRequired {
        required_confirmation_text: required.to_string(),
    })
}
