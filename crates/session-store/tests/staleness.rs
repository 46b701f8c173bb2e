use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bic_browser_driver::{DriverTarget, MockDriver, RawSnapshot};
use bic_contract::{BicError, ErrorCode, PageIdentity};
use bic_core_types::{ActionId, ObservationId};
use bic_session_store::SessionStore;
use pretty_assertions::assert_eq;

fn driver() -> Arc<MockDriver> {
    Arc::new(MockDriver::single(RawSnapshot::new(PageIdentity::from_url(
        "https://example.com/",
    ))))
}

fn arena(ids: &[&str]) -> HashMap<ActionId, DriverTarget> {
    ids.iter()
        .map(|id| (ActionId::from(*id), DriverTarget::element(format!("#{id}"), false)))
        .collect()
}

#[test]
fn older_observation_goes_stale_after_replacement() {
    let store = SessionStore::new();
    let session = store.create_session(driver());
    let first = ObservationId::from("obs_a");
    let second = ObservationId::from("obs_b");

    store
        .set_current_observation(&session, first.clone(), arena(&["a_1", "a_2"]))
        .unwrap();
    assert_eq!(
        store
            .resolve_action_target(&session, &first, &ActionId::from("a_2"))
            .unwrap(),
        DriverTarget::element("#a_2", false)
    );

    store
        .set_current_observation(&session, second.clone(), arena(&["a_1"]))
        .unwrap();

    match store.resolve_action_target(&session, &first, &ActionId::from("a_1")) {
        Err(BicError::StaleObservation { current, .. }) => assert_eq!(current, Some(second.clone())),
        other => panic!("expected stale observation, got {other:?}"),
    }

    // replaced, not merged
    let err = store
        .resolve_action_target(&session, &second, &ActionId::from("a_2"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ActionNotFound);
    assert!(store
        .resolve_action_target(&session, &second, &ActionId::from("a_1"))
        .is_ok());
}

#[test]
fn sessions_do_not_share_arenas() {
    let store = SessionStore::new();
    let left = store.create_session(driver());
    let right = store.create_session(driver());
    let obs = ObservationId::from("obs_shared_name");

    store
        .set_current_observation(&left, obs.clone(), arena(&["a_1"]))
        .unwrap();

    let err = store
        .resolve_action_target(&right, &obs, &ActionId::from("a_1"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StaleObservation);
}

#[tokio::test]
async fn lease_serializes_operations_on_one_session() {
    let store = Arc::new(SessionStore::new());
    let session = store.create_session(driver());

    let lease = store.lease(&session).await.unwrap();
    let waiter = {
        let store = store.clone();
        let session = session.clone();
        tokio::spawn(async move { store.lease(&session).await.map(|_| ()) })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    drop(lease);
    waiter.await.unwrap().unwrap();
}

#[tokio::test]
async fn close_waits_for_in_flight_lease() {
    let store = Arc::new(SessionStore::new());
    let mock = driver();
    let session = store.create_session(mock.clone());

    let lease = store.lease(&session).await.unwrap();
    let closer = {
        let store = store.clone();
        let session = session.clone();
        tokio::spawn(async move { store.close_session(&session).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!mock.is_closed());

    drop(lease);
    closer.await.unwrap().unwrap();
    assert!(mock.is_closed());
}
