//! Session state machine.
//!
//! A session is *open* from [`SessionStore::create_session`] until
//! [`SessionStore::close_session`] removes it. Each successful observe registers a fresh
//! [`ObservationArena`] which replaces the previous one wholesale and advances the
//! session's epoch; action ids only resolve against the current arena.

use std::collections::HashMap;
use std::sync::Arc;

use bic_browser_driver::{BrowserDriver, DriverTarget};
use bic_contract::{BicError, BicResult};
use bic_core_types::{ActionId, ObservationId, SessionId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Action targets minted by one observation. Never mutated after registration.
#[derive(Debug)]
pub struct ObservationArena {
    pub observation_id: ObservationId,
    pub epoch: u64,
    targets: HashMap<ActionId, DriverTarget>,
}

impl ObservationArena {
    pub fn target(&self, action_id: &ActionId) -> Option<&DriverTarget> {
        self.targets.get(action_id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

struct SessionEntry {
    driver: Arc<dyn BrowserDriver>,
    epoch: u64,
    current: Option<Arc<ObservationArena>>,
    op_lock: Arc<Mutex<()>>,
}

/// Exclusive use of one session's driver for the lifetime of the lease.
///
/// Observe and act each run under a single lease so that snapshot, transform and
/// registration complete as one unit before the next operation on the same session starts.
pub struct SessionLease {
    session_id: SessionId,
    driver: Arc<dyn BrowserDriver>,
    _guard: OwnedMutexGuard<()>,
}

impl SessionLease {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.driver
    }
}

/// In-memory registry of open sessions. Independent instances share nothing.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionEntry>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&self, driver: Arc<dyn BrowserDriver>) -> SessionId {
        let session_id = SessionId::new();
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                driver,
                epoch: 0,
                current: None,
                op_lock: Arc::new(Mutex::new(())),
            },
        );
        info!(session = %session_id, "session opened");
        session_id
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn driver(&self, session_id: &SessionId) -> BicResult<Arc<dyn BrowserDriver>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.driver.clone())
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))
    }

    pub fn epoch(&self, session_id: &SessionId) -> BicResult<u64> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.epoch)
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))
    }

    pub fn current_observation(&self, session_id: &SessionId) -> BicResult<Option<ObservationId>> {
        self.sessions
            .get(session_id)
            .map(|entry| {
                entry
                    .current
                    .as_ref()
                    .map(|arena| arena.observation_id.clone())
            })
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))
    }

    pub fn current_arena(
        &self,
        session_id: &SessionId,
    ) -> BicResult<Option<Arc<ObservationArena>>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.current.clone())
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))
    }

    /// Swaps in a new arena and advances the epoch. Returns the new epoch.
    pub fn set_current_observation(
        &self,
        session_id: &SessionId,
        observation_id: ObservationId,
        targets: HashMap<ActionId, DriverTarget>,
    ) -> BicResult<u64> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))?;
        entry.epoch += 1;
        let epoch = entry.epoch;
        let targets_len = targets.len();
        entry.current = Some(Arc::new(ObservationArena {
            observation_id: observation_id.clone(),
            epoch,
            targets,
        }));
        debug!(
            session = %session_id,
            observation = %observation_id,
            epoch,
            targets = targets_len,
            "observation registered"
        );
        Ok(epoch)
    }

    pub fn resolve_action_target(
        &self,
        session_id: &SessionId,
        observation_id: &ObservationId,
        action_id: &ActionId,
    ) -> BicResult<DriverTarget> {
        let arena = self
            .sessions
            .get(session_id)
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))?
            .current
            .clone();

        let arena = match arena {
            Some(arena) if &arena.observation_id == observation_id => arena,
            other => {
                debug!(session = %session_id, observation = %observation_id, "stale observation");
                return Err(BicError::StaleObservation {
                    observation_id: observation_id.clone(),
                    current: other.map(|arena| arena.observation_id.clone()),
                });
            }
        };

        arena.target(action_id).cloned().ok_or_else(|| {
            debug!(session = %session_id, action_id = %action_id, "unknown action id");
            BicError::ActionNotFound {
                observation_id: observation_id.clone(),
                action_id: action_id.clone(),
            }
        })
    }

    /// Waits for the session's operation lock and hands out its driver.
    pub async fn lease(&self, session_id: &SessionId) -> BicResult<SessionLease> {
        let (driver, op_lock) = {
            let entry = self
                .sessions
                .get(session_id)
                .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))?;
            (entry.driver.clone(), entry.op_lock.clone())
        };

        let guard = op_lock.lock_owned().await;
        // closed while we were queued
        if !self.sessions.contains_key(session_id) {
            return Err(BicError::SessionNotFound(session_id.clone()));
        }

        Ok(SessionLease {
            session_id: session_id.clone(),
            driver,
            _guard: guard,
        })
    }

    /// Removes the session, waits for in-flight operations and releases its driver.
    ///
    /// A second close of the same id fails with `SESSION_NOT_FOUND`.
    pub async fn close_session(&self, session_id: &SessionId) -> BicResult<()> {
        let (_, entry) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| BicError::SessionNotFound(session_id.clone()))?;

        let _guard = entry.op_lock.lock().await;
        if let Err(err) = entry.driver.close().await {
            warn!(session = %session_id, %err, "driver close failed");
        }
        info!(session = %session_id, epoch = entry.epoch, "session closed");
        Ok(())
    }

    /// Closes every open session. Used at shutdown.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for session_id in self.session_ids() {
            if self.close_session(&session_id).await.is_ok() {
                closed += 1;
            }
        }
        closed
    }
}
