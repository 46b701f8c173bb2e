//! Act pipeline: resolve, gate, dispatch, re-observe, verify.

use bic_browser_driver::{ActRequest, DriverTarget};
use bic_contract::{BicError, BicResult, Risk};
use bic_perceiver::observe_with_lease;
use bic_session_store::{SessionLease, SessionStore};
use tracing::{debug, info};

use crate::conditions::evaluate_expectations;
use crate::gate::{enforce_safety, required_confirmation_text};
use crate::types::{ActInput, ActOutcome, ActTarget};

/// Runs one act call under the session lease.
///
/// Resolution and gate failures are reported in [`ActOutcome::error`] next to a fresh
/// observation. Only an unknown session, a driver failure or an invalid observation
/// surface as `Err`.
pub async fn act(store: &SessionStore, input: ActInput) -> BicResult<ActOutcome> {
    let lease = store.lease(&input.session_id).await?;
    let session_id = lease.session_id().clone();

    let mut failure: Option<BicError> = None;
    let target = match &input.target {
        ActTarget::Page => Some(DriverTarget::Page),
        ActTarget::Element {
            action_id,
            risk,
            label,
        } => {
            let resolved =
                match store.resolve_action_target(&session_id, &input.observation_id, action_id) {
                    Ok(target) => Some(target),
                    Err(err @ BicError::SessionNotFound(_)) => return Err(err),
                    Err(err) => {
                        debug!(
                            session = %session_id,
                            observation = %input.observation_id,
                            action_id = %action_id,
                            code = err.code().as_str(),
                            "action target not resolved"
                        );
                        failure = Some(err);
                        None
                    }
                };

            if *risk == Risk::Danger {
                let label = label
                    .as_deref()
                    .filter(|label| !label.trim().is_empty())
                    .unwrap_or(action_id.as_str());
                let domain = current_domain(&lease, &input).await;
                let required =
                    required_confirmation_text(input.action.action_type(), label, &domain);
                if let Err(err) = enforce_safety(
                    &required,
                    input.confirm,
                    input.confirmation_text.as_deref(),
                ) {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
            resolved
        }
    };

    match (&failure, target) {
        (None, Some(target)) => {
            info!(
                session = %session_id,
                action = input.action.action_type(),
                risk = ?input.target.risk(),
                "dispatching action"
            );
            lease
                .driver()
                .act(ActRequest {
                    target,
                    action: input.action.clone(),
                })
                .await
                .map_err(BicError::from)?;
        }
        _ => debug!(session = %session_id, "action not dispatched"),
    }

    let next_observation = observe_with_lease(store, &lease, &input.observe).await?;
    let verification = evaluate_expectations(input.expect.as_ref(), &next_observation);

    Ok(ActOutcome {
        next_observation,
        verification,
        error: failure.as_ref().map(BicError::to_envelope),
    })
}

/// Best-effort read of the page domain. Never registers an observation.
async fn current_domain(lease: &SessionLease, input: &ActInput) -> String {
    match lease
        .driver()
        .snapshot(&input.observe.snapshot_request())
        .await
    {
        Ok(snapshot) => snapshot.page.domain,
        Err(err) => {
            debug!(session = %lease.session_id(), error = %err, "identity snapshot failed");
            String::new()
        }
    }
}
