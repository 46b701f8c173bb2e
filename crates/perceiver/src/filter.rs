use bic_contract::{Landmark, ObserveScope};

use crate::extract::Candidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterOptions {
    pub scope: ObserveScope,
    pub include_hidden: bool,
    pub include_disabled: bool,
}

/// Applies scope and visibility options, preserving extraction order.
pub fn filter_candidates(candidates: Vec<Candidate>, options: FilterOptions) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| options.include_hidden || c.visible)
        .filter(|c| options.include_disabled || !c.disabled)
        .filter(|c| match options.scope {
            ObserveScope::Document => true,
            ObserveScope::Viewport => c.visible,
            ObserveScope::Modal => c.landmark == Landmark::Modal,
        })
        .collect()
}
