//! Transaction discipline on a session

use crate::common::scripted_kit;
use sqlkit::{IsolationLevel, QueryOptions};

#[tokio::test]
async fn test_commit_or_rollback_without_begin_fails() {
    let (kit, backend) = scripted_kit(None);
    let mut session = kit.default_session().unwrap();

    assert!(session.commit_transaction().await.unwrap_err().is_invalid_state());
    assert!(session
        .rollback_transaction()
        .await
        .unwrap_err()
        .is_invalid_state());
    assert!(backend.transaction_log().is_empty());
}

#[tokio::test]
async fn test_second_commit_fails() {
    let (kit, backend) = scripted_kit(None);
    backend.push_affected(1);
    let mut session = kit.default_session().unwrap();

    session.begin_transaction(None).await.unwrap();
    assert!(session.in_transaction());
    session
        .execute(
            "UPDATE accounts SET balance = balance - @Amount",
            QueryOptions::new().param("Amount", 10),
        )
        .await
        .unwrap();
    session.commit_transaction().await.unwrap();
    assert!(!session.in_transaction());

    let err = session.commit_transaction().await.unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(backend.transaction_log(), vec!["BEGIN", "COMMIT"]);
}

#[tokio::test]
async fn test_statements_share_the_transaction_connection() {
    let (kit, backend) = scripted_kit(None);
    backend.push_affected(1).push_affected(1);
    let mut session = kit.default_session().unwrap();

    session
        .begin_transaction(Some(IsolationLevel::Serializable))
        .await
        .unwrap();
    session
        .execute("INSERT INTO audit DEFAULT VALUES", QueryOptions::new())
        .await
        .unwrap();
    session
        .execute("INSERT INTO audit DEFAULT VALUES", QueryOptions::new())
        .await
        .unwrap();
    session.rollback_transaction().await.unwrap();

    assert_eq!(backend.connections().len(), 1);
    assert_eq!(
        backend.transaction_log(),
        vec!["BEGIN ISOLATION LEVEL SERIALIZABLE", "ROLLBACK"]
    );
}

#[tokio::test]
async fn test_nested_begin_fails() {
    let (kit, _backend) = scripted_kit(None);
    let mut session = kit.default_session().unwrap();

    session.begin_transaction(None).await.unwrap();
    let err = session.begin_transaction(None).await.unwrap_err();
    assert!(err.is_invalid_state());
    assert!(session.in_transaction());
}

#[tokio::test]
async fn test_close_rolls_back_open_transaction() {
    let (kit, backend) = scripted_kit(None);
    let mut session = kit.default_session().unwrap();

    session.begin_transaction(None).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(backend.transaction_log(), vec!["BEGIN", "ROLLBACK"]);
    assert_eq!(backend.closed_count(), 1);
}
