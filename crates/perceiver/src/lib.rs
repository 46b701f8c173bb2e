//! Perception layer: raw snapshot in, BIC observation out.
//!
//! The transform chain is extract → filter → rank → paginate → forms → redact. Every stage
//! except the driver snapshot is synchronous and pure; [`observe`] wraps the chain with the
//! session lease and registers the resulting action targets.

pub mod extract;
pub mod filter;
pub mod forms;
pub mod observe;
pub mod paginate;
pub mod rank;
pub mod redact;
pub mod risk;
pub mod selector;

pub use extract::{extract_candidates, Candidate};
pub use filter::{filter_candidates, FilterOptions};
pub use forms::derive_forms;
pub use observe::{
    build_observation, ensure_valid, observe, observe_with_lease, BuiltObservation,
    ObserveOptions, ObserveRequest,
};
pub use paginate::{decode_cursor, encode_cursor, paginate, Page};
pub use rank::{rank_affordances, rank_candidates};
pub use redact::redact_affordances;
pub use risk::classify_risk;
pub use selector::SelectorIndex;
