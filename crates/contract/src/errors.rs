//! Error codes and the caller-facing error envelope.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use bic_core_types::{ActionId, ObservationId, SessionId};

/// Closed set of envelope codes.
///
/// The first four are produced by the observe/act protocol itself. `ContractMismatch` and
/// `InternalError` belong to the tool host surface (bad arguments, invalid documents,
/// driver launch/IO failures).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    StaleObservation,
    ActionNotFound,
    SafetyConfirmationRequired,
    ContractMismatch,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::StaleObservation => "STALE_OBSERVATION",
            ErrorCode::ActionNotFound => "ACTION_NOT_FOUND",
            ErrorCode::SafetyConfirmationRequired => "SAFETY_CONFIRMATION_REQUIRED",
            ErrorCode::ContractMismatch => "CONTRACT_MISMATCH",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BicError {
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Observation {observation_id} is stale")]
    StaleObservation {
        observation_id: ObservationId,
        current: Option<ObservationId>,
    },

    #[error("Action {action_id} not found in observation {observation_id}")]
    ActionNotFound {
        observation_id: ObservationId,
        action_id: ActionId,
    },

    #[error("Safety confirmation required: {required_confirmation_text}")]
    SafetyConfirmationRequired { required_confirmation_text: String },

    #[error("Contract mismatch: {message}")]
    ContractMismatch { message: String, issues: Vec<String> },

    #[error("Driver failure: {0}")]
    Driver(String),
}

impl BicError {
    pub fn contract(message: impl Into<String>, issues: Vec<String>) -> Self {
        Self::ContractMismatch {
            message: message.into(),
            issues,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BicError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            BicError::StaleObservation { .. } => ErrorCode::StaleObservation,
            BicError::ActionNotFound { .. } => ErrorCode::ActionNotFound,
            BicError::SafetyConfirmationRequired { .. } => ErrorCode::SafetyConfirmationRequired,
            BicError::ContractMismatch { .. } => ErrorCode::ContractMismatch,
            BicError::Driver(_) => ErrorCode::InternalError,
        }
    }

    /// Every code is currently non-retryable: callers re-observe instead of retrying blindly.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        let details = match self {
            BicError::SessionNotFound(session) => Some(json!({ "sessionId": session })),
            BicError::StaleObservation {
                observation_id,
                current,
            } => Some(json!({
                "observationId": observation_id,
                "currentObservationId": current,
            })),
            BicError::ActionNotFound {
                observation_id,
                action_id,
            } => Some(json!({
                "observationId": observation_id,
                "actionId": action_id,
            })),
            BicError::SafetyConfirmationRequired {
                required_confirmation_text,
            } => Some(json!({ "requiredConfirmationText": required_confirmation_text })),
            BicError::ContractMismatch { issues, .. } if !issues.is_empty() => {
                Some(json!({ "issues": issues }))
            }
            BicError::ContractMismatch { .. } | BicError::Driver(_) => None,
        };

        ErrorEnvelope {
            code: self.code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
            details,
        }
    }
}

impl From<BicError> for ErrorEnvelope {
    fn from(err: BicError) -> Self {
        err.to_envelope()
    }
}

pub type BicResult<T> = Result<T, BicError>;
