//! Value redaction for sensitive affordances.

use bic_contract::Affordance;

pub fn redact_affordance(mut affordance: Affordance) -> Affordance {
    if affordance.is_sensitive() {
        affordance.value = None;
        affordance.value_redacted = Some(true);
    }
    affordance
}

pub fn redact_affordances(affordances: Vec<Affordance>) -> Vec<Affordance> {
    affordances.into_iter().map(redact_affordance).collect()
}
