//! Tool host errors and their mapping onto the wire envelope.

use bic_contract::{BicError, ErrorCode, ErrorEnvelope};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolHostError {
    #[error("Invalid arguments for {tool}.")]
    InvalidArguments { tool: String, issues: Vec<String> },

    #[error("Unknown browser tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Protocol(#[from] BicError),

    #[error("{0}")]
    Internal(String),
}

impl ToolHostError {
    pub fn invalid(tool: &str, issues: Vec<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            issues,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ToolHostError::InvalidArguments { .. } | ToolHostError::UnknownTool(_) => {
                ErrorCode::ContractMismatch
            }
            ToolHostError::Protocol(err) => err.code(),
            ToolHostError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            ToolHostError::Protocol(err) => err.to_envelope(),
            ToolHostError::InvalidArguments { issues, .. } => {
                ErrorEnvelope::new(self.code(), self.to_string())
                    .with_details(json!({ "issues": issues }))
            }
            _ => ErrorEnvelope::new(self.code(), self.to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolHostError {
    fn from(err: serde_json::Error) -> Self {
        ToolHostError::Internal(format!("result not serializable: {err}"))
    }
}
