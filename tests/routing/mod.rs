//! Connection routing as seen by sessions

use crate::common::{scripted_kit, user_rows, User};
use sqlkit::test_helpers::{PRIMARY_URL, REPLICA_URL, REPORTING_CONNECTION};
use sqlkit::{ConnectionRole, ConnectionTarget, QueryOptions};

#[tokio::test]
async fn test_read_only_session_uses_replica() {
    let (kit, backend) = scripted_kit(None);
    backend.push_rows(user_rows(1));

    let mut session = kit
        .session(ConnectionTarget::replica(REPORTING_CONNECTION).unwrap())
        .unwrap();
    let _: Vec<User> = session
        .query("SELECT id, name FROM users", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(backend.connections(), vec![REPLICA_URL.to_string()]);
}

#[tokio::test]
async fn test_master_slave_writes_go_to_primary() {
    let (kit, backend) = scripted_kit(None);
    backend.push_affected(1);

    let target = ConnectionTarget::new(REPORTING_CONNECTION, true, false).unwrap();
    assert_eq!(target.role(), ConnectionRole::Primary);
    let mut session = kit.session(target).unwrap();
    session
        .execute("DELETE FROM report_cache", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(backend.connections(), vec![PRIMARY_URL.to_string()]);
}

#[test]
fn test_read_only_without_master_slave_fails_at_construction() {
    let err = ConnectionTarget::new("DefaultConnection", false, true).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_session_targets_are_checked_against_configuration() {
    let (kit, _backend) = scripted_kit(None);

    let unknown = kit
        .session(ConnectionTarget::primary("Warehouse").unwrap())
        .unwrap_err();
    assert!(unknown.is_configuration());

    // DefaultConnection has no master_slave entry
    let not_grouped = kit
        .session(ConnectionTarget::replica("DefaultConnection").unwrap())
        .unwrap_err();
    assert!(not_grouped.is_configuration());
}

#[test]
fn test_router_never_falls_back_to_primary() {
    let (kit, _backend) = scripted_kit(None);
    let router = kit.router();

    assert_eq!(
        router
            .resolve("DefaultConnection", ConnectionRole::Primary)
            .unwrap(),
        PRIMARY_URL
    );
    assert!(router
        .resolve("DefaultConnection", ConnectionRole::Replica)
        .unwrap_err()
        .is_configuration());
    assert_eq!(
        router
            .resolve(REPORTING_CONNECTION, ConnectionRole::Replica)
            .unwrap(),
        REPLICA_URL
    );
}

#[tokio::test]
async fn test_connection_is_opened_lazily_and_reused() {
    let (kit, backend) = scripted_kit(None);
    backend.push_rows(vec![]).push_rows(vec![]);

    let mut session = kit.default_session().unwrap();
    assert!(!session.is_connected());
    assert!(backend.connections().is_empty());

    for _ in 0..2 {
        let _: Vec<User> = session
            .query("SELECT id, name FROM users", QueryOptions::new())
            .await
            .unwrap();
    }

    assert!(session.is_connected());
    assert_eq!(backend.connections().len(), 1);
    session.close().await.unwrap();
    assert_eq!(backend.closed_count(), 1);
}
