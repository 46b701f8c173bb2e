use bic_browser_driver::DriverAction;
use bic_contract::{ErrorEnvelope, Observation, Risk, VerificationResult};
use bic_core_types::{ActionId, ObservationId, SessionId};
use bic_perceiver::ObserveOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conditions::Expectations;

/// What an act call aims at. Element targets carry the caller's declared risk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum ActTarget {
    #[serde(rename_all = "camelCase")]
    Element {
        #[schemars(with = "String")]
        action_id: ActionId,
        #[serde(default)]
        risk: Risk,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    #[default]
    Page,
}

impl ActTarget {
    pub fn element(action_id: impl Into<ActionId>, risk: Risk) -> Self {
        ActTarget::Element {
            action_id: action_id.into(),
            risk,
            label: None,
        }
    }

    pub fn risk(&self) -> Risk {
        match self {
            ActTarget::Element { risk, .. } => *risk,
            ActTarget::Page => Risk::Safe,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActInput {
    pub session_id: SessionId,
    pub observation_id: ObservationId,
    pub target: ActTarget,
    pub action: DriverAction,
    pub confirm: Option<bool>,
    pub confirmation_text: Option<String>,
    pub expect: Option<Expectations>,
    /// Options for the re-observe that always follows the action.
    pub observe: ObserveOptions,
}

impl ActInput {
    pub fn new(
        session_id: SessionId,
        observation_id: ObservationId,
        target: ActTarget,
        action: DriverAction,
    ) -> Self {
        Self {
            session_id,
            observation_id,
            target,
            action,
            confirm: None,
            confirmation_text: None,
            expect: None,
            observe: ObserveOptions::default(),
        }
    }

    pub fn confirmed(mut self, text: impl Into<String>) -> Self {
        self.confirm = Some(true);
        self.confirmation_text = Some(text.into());
        self
    }

    pub fn expecting(mut self, expect: Expectations) -> Self {
        self.expect = Some(expect);
        self
    }
}

/// Act result. `error` is set only for target resolution and safety gate failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActOutcome {
    pub next_observation: Observation,
    pub verification: VerificationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl ActOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
