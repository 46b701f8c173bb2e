//! Act pipeline with post-action expectations.
//!
//! - [`act`] resolves an action id against the current observation, enforces the
//!   confirmation gate for danger-risk targets, dispatches through the driver and always
//!   re-observes.
//! - [`evaluate_expectations`] checks caller predicates against the fresh observation.

pub mod act;
pub mod conditions;
pub mod gate;
pub mod types;

pub use act::act;
pub use conditions::{evaluate_expectations, Expectations};
pub use gate::{enforce_safety, required_confirmation_text};
pub use types::{ActInput, ActOutcome, ActTarget};
