//! Observe pipeline: snapshot, transform chain, validation, registration.

use std::collections::HashMap;

use bic_browser_driver::{DriverTarget, RawSnapshot, SnapshotRequest};
use bic_contract::{
    validate_observation, BicError, BicResult, ObserveMode, ObserveScope, Observation,
    DEFAULT_MAX_AFFORDANCES, MAX_AFFORDANCES, MIN_AFFORDANCES, SCHEMA_VERSION,
};
use bic_core_types::{ActionId, ObservationId, SessionId};
use bic_session_store::{SessionLease, SessionStore};
use chrono::Utc;
use tracing::{debug, info};

use crate::extract::extract_candidates;
use crate::filter::{filter_candidates, FilterOptions};
use crate::forms::derive_forms;
use crate::paginate::paginate;
use crate::rank::rank_candidates;
use crate::redact::redact_affordances;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObserveOptions {
    pub mode: ObserveMode,
    pub scope: ObserveScope,
    pub max_affordances: usize,
    pub include_hidden: bool,
    pub include_disabled: bool,
    pub cursor: Option<String>,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            mode: ObserveMode::A11y,
            scope: ObserveScope::Document,
            max_affordances: DEFAULT_MAX_AFFORDANCES,
            include_hidden: false,
            include_disabled: true,
            cursor: None,
        }
    }
}

impl ObserveOptions {
    pub fn clamped_max(&self) -> usize {
        self.max_affordances.clamp(MIN_AFFORDANCES, MAX_AFFORDANCES)
    }

    pub fn snapshot_request(&self) -> SnapshotRequest {
        SnapshotRequest {
            mode: self.mode,
            scope: self.scope,
            include_hidden: self.include_hidden,
            include_disabled: self.include_disabled,
        }
    }

    fn filter(&self) -> FilterOptions {
        FilterOptions {
            scope: self.scope,
            include_hidden: self.include_hidden,
            include_disabled: self.include_disabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObserveRequest {
    pub session_id: SessionId,
    pub options: ObserveOptions,
}

impl ObserveRequest {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            options: ObserveOptions::default(),
        }
    }
}

/// An observation plus the session-private targets its action ids resolve to.
#[derive(Debug)]
pub struct BuiltObservation {
    pub observation: Observation,
    pub targets: HashMap<ActionId, DriverTarget>,
}

/// Runs the pure transform chain over one snapshot.
pub fn build_observation(
    session_id: SessionId,
    snapshot: RawSnapshot,
    options: &ObserveOptions,
) -> BuiltObservation {
    let candidates = filter_candidates(extract_candidates(&snapshot), options.filter());
    let ranked = rank_candidates(candidates);
    let page = paginate(ranked, options.clamped_max(), options.cursor.as_deref());

    let mut targets = HashMap::with_capacity(page.items.len());
    let mut affordances = Vec::with_capacity(page.items.len());
    for (position, candidate) in page.items.into_iter().enumerate() {
        let action_id = ActionId::ordinal(position + 1);
        let (affordance, target) = candidate.into_parts(action_id.clone());
        targets.insert(action_id, target);
        affordances.push(affordance);
    }

    let forms = derive_forms(&affordances);
    let affordances = redact_affordances(affordances);

    BuiltObservation {
        observation: Observation {
            schema_version: SCHEMA_VERSION.to_string(),
            observation_id: ObservationId::new(),
            session_id,
            created_at: Utc::now(),
            mode: options.mode,
            scope: options.scope,
            page: snapshot.page,
            affordances,
            forms,
            total_affordances: page.total,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        },
        targets,
    }
}

/// Structural check before a document leaves the pipeline.
pub fn ensure_valid(observation: &Observation) -> BicResult<()> {
    let value = serde_json::to_value(observation)
        .map_err(|err| BicError::contract(format!("observation not serializable: {err}"), vec![]))?;
    validate_observation(&value)
        .map_err(|violation| BicError::contract("observation failed validation", violation.messages()))
}

pub async fn observe(store: &SessionStore, request: ObserveRequest) -> BicResult<Observation> {
    let lease = store.lease(&request.session_id).await?;
    observe_with_lease(store, &lease, &request.options).await
}

/// Observe for callers that already hold the session's lease (the act pipeline).
pub async fn observe_with_lease(
    store: &SessionStore,
    lease: &SessionLease,
    options: &ObserveOptions,
) -> BicResult<Observation> {
    let session_id = lease.session_id().clone();
    debug!(session = %session_id, scope = ?options.scope, "observe started");

    let snapshot = lease
        .driver()
        .snapshot(&options.snapshot_request())
        .await
        .map_err(BicError::from)?;

    let BuiltObservation {
        observation,
        targets,
    } = build_observation(session_id.clone(), snapshot, options);
    ensure_valid(&observation)?;

    let epoch =
        store.set_current_observation(&session_id, observation.observation_id.clone(), targets)?;
    info!(
        session = %session_id,
        observation = %observation.observation_id,
        epoch,
        affordances = observation.affordances.len(),
        total = observation.total_affordances,
        has_more = observation.has_more,
        "observe finished"
    );
    Ok(observation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::LANDMARK_ATTR;
    use bic_contract::PageIdentity;
    use pretty_assertions::assert_eq;

    fn snapshot() -> RawSnapshot {
        RawSnapshot::new(PageIdentity::from_url("https://example.com/login"))
            .with_element("link", "Docs", "a", &[(LANDMARK_ATTR, "nav"), ("href", "/docs")])
            .with_element("textbox", "Password", "input", &[(LANDMARK_ATTR, "main"), ("type", "password"), ("value", "s3cret")])
            .with_element("button", "Close", "button", &[(LANDMARK_ATTR, "modal")])
    }

    #[test]
    fn ids_follow_ranked_page_order() {
        let built = build_observation(SessionId::from("s"), snapshot(), &ObserveOptions::default());
        let names: Vec<_> = built
            .observation
            .affordances
            .iter()
            .map(|a| (a.action_id.to_string(), a.name.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a_1".to_string(), "Close".to_string()),
                ("a_2".to_string(), "Password".to_string()),
                ("a_3".to_string(), "Docs".to_string()),
            ]
        );
        assert_eq!(built.targets.len(), 3);
        assert_eq!(built.observation.forms[0].fields[0].action_id.as_str(), "a_2");
        assert_eq!(built.observation.affordances[1].value, None);
        assert!(ensure_valid(&built.observation).is_ok());
    }

    #[test]
    fn max_is_clamped_and_ids_restart_per_page() {
        let options = ObserveOptions {
            max_affordances: 0,
            ..ObserveOptions::default()
        };
        let first = build_observation(SessionId::from("s"), snapshot(), &options);
        assert_eq!(first.observation.affordances.len(), 1);
        assert_eq!(first.observation.total_affordances, 3);
        assert!(first.observation.has_more);

        let next = ObserveOptions {
            cursor: first.observation.next_cursor.clone(),
            ..options
        };
        let second = build_observation(SessionId::from("s"), snapshot(), &next);
        assert_eq!(second.observation.affordances[0].action_id.as_str(), "a_1");
        assert_eq!(second.observation.affordances[0].name, "Password");
    }
}
