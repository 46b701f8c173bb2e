//! Driver-level failures.

use std::fmt;

use bic_contract::BicError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverErrorKind {
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("target element not found")]
    TargetNotFound,
    #[error("unsupported action for target")]
    Unsupported,
    #[error("browser launch failed")]
    Launch,
    #[error("driver closed")]
    Closed,
    #[error("internal error")]
    Internal,
}

/// Error surfaced by a [`crate::BrowserDriver`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl DriverError {
    pub fn new(kind: DriverErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn internal(hint: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Internal).with_hint(hint)
    }

    pub fn closed() -> Self {
        Self::new(DriverErrorKind::Closed)
    }
}

impl From<DriverError> for BicError {
    fn from(err: DriverError) -> Self {
        BicError::Driver(err.to_string())
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
