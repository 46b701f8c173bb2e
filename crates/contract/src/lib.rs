//! Browser Interaction Contract (BIC) v0.1
//!
//! This crate defines the versioned observation document handed to a controlling agent:
//! - page identity and blocking conditions
//! - ranked, paged interactive affordances
//! - reference-only form groupings
//! - verification results and the error envelope
//!
//! Everything here is plain data. [`validate`] checks the structural shape of a document
//! (presence, types, enum membership) before it crosses a process boundary.

pub mod errors;
pub mod model;
pub mod validate;

pub use bic_core_types::{ActionId, FrameId, ObservationId, SessionId};
pub use errors::{BicError, BicResult, ErrorCode, ErrorEnvelope};
pub use model::*;
pub use validate::{
    parse_observation, validate_observation, validate_verification, ContractViolation,
    ValidationIssue,
};
