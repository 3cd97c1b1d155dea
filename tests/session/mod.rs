//! Session query methods against the scripted backend

mod catalog;
mod transactions;

use crate::common::{count_row, scripted_kit, user_row, user_rows, User};
use serde_json::json;
use sqlkit::test_helpers::{cache_everything, StatementKind};
use sqlkit::{QueryOptions, Row, SqlKitError};
use std::time::Duration;

#[tokio::test]
async fn test_dynamic_rows_keep_column_order() {
    let (kit, backend) = scripted_kit(None);
    backend.push_rows(vec![Row::from_pairs([
        ("zeta", json!(1)),
        ("alpha", json!("a")),
    ])]);
    let mut session = kit.default_session().unwrap();

    let rows = session
        .query_rows("SELECT zeta, alpha FROM t", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].columns(), &["zeta".to_string(), "alpha".to_string()]);
    assert_eq!(rows[0].get("alpha"), Some(&json!("a")));
}

#[tokio::test]
async fn test_dynamic_rows_survive_the_cache() {
    let (kit, backend) = scripted_kit(Some(cache_everything()));
    backend.push_rows(vec![Row::from_pairs([("b", json!(2)), ("a", json!(1))])]);
    let mut session = kit.default_session().unwrap();

    let first = session
        .query_rows("SELECT b, a FROM t", QueryOptions::new())
        .await
        .unwrap();
    let cached = session
        .query_rows("SELECT b, a FROM t", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(first, cached);
    assert_eq!(cached[0].columns()[0], "b");
    assert_eq!(backend.execution_count(), 1);
}

#[tokio::test]
async fn test_query_first() {
    let (kit, backend) = scripted_kit(None);
    backend.push_rows(user_rows(3)).push_rows(vec![]);
    let mut session = kit.default_session().unwrap();

    let first: Option<User> = session
        .query_first("SELECT id, name FROM users", QueryOptions::new())
        .await
        .unwrap();
    let none: Option<User> = session
        .query_first("SELECT id, name FROM users WHERE false", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(first.map(|u| u.id), Some(1));
    assert!(none.is_none());
}

#[tokio::test]
async fn test_query_single_rejects_multiple_rows() {
    let (kit, backend) = scripted_kit(None);
    backend
        .push_rows(vec![user_row(7, "ada")])
        .push_rows(user_rows(2));
    let mut session = kit.default_session().unwrap();

    let single: Option<User> = session
        .query_single(
            "SELECT id, name FROM users WHERE id = @Id",
            QueryOptions::new().param("Id", 7),
        )
        .await
        .unwrap();
    assert_eq!(single.map(|u| u.name), Some("ada".to_string()));

    let err = session
        .query_single::<User>("SELECT id, name FROM users", QueryOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_execute_scalar() {
    let (kit, backend) = scripted_kit(Some(cache_everything()));
    backend
        .push_rows(vec![count_row(42)])
        .push_rows(vec![count_row(43)])
        .push_rows(vec![Row::from_pairs([("max", json!(null))])]);
    let mut session = kit.default_session().unwrap();

    let first: Option<i64> = session
        .execute_scalar("SELECT count(*) FROM users", QueryOptions::new())
        .await
        .unwrap();
    let second: Option<i64> = session
        .execute_scalar("SELECT count(*) FROM users", QueryOptions::new())
        .await
        .unwrap();
    let null: Option<i64> = session
        .execute_scalar("SELECT max(id) FROM empty", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(first, Some(42));
    assert_eq!(second, Some(43));
    assert_eq!(null, None);
}

#[tokio::test]
async fn test_query_multiple_returns_every_result_set() {
    let (kit, backend) = scripted_kit(None);
    backend.push_result_sets(vec![user_rows(2), vec![count_row(2)]]);
    let mut session = kit.default_session().unwrap();

    let result_sets = session
        .query_multiple(
            "SELECT id, name FROM users; SELECT count(*) FROM users",
            QueryOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(result_sets.len(), 2);
    assert_eq!(result_sets[1][0].decode_scalar::<i64>().unwrap(), 2);
    assert_eq!(backend.executed()[0].kind, StatementKind::FetchMultiple);
}

#[tokio::test]
async fn test_missing_parameter_is_rejected() {
    let (kit, _backend) = scripted_kit(None);
    let mut session = kit.default_session().unwrap();

    let err = session
        .query::<User>(
            "SELECT id, name FROM users WHERE id = @Id",
            QueryOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_timeout_and_struct_parameters_reach_the_backend() {
    #[derive(serde::Serialize)]
    struct Filter {
        #[serde(rename = "Name")]
        name: String,
    }

    let (kit, backend) = scripted_kit(None);
    backend.push_rows(vec![]);
    let mut session = kit.default_session().unwrap();

    let params = sqlkit::Parameters::from_serialize(&Filter {
        name: "ada".to_string(),
    })
    .unwrap();
    let _: Vec<User> = session
        .query(
            "SELECT id, name FROM users WHERE name = @Name",
            QueryOptions::new()
                .params(params)
                .timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    let executed = backend.executed();
    assert_eq!(executed[0].timeout, Some(Duration::from_secs(5)));
    assert_eq!(executed[0].params.get("Name"), Some(&json!("ada")));
}

#[tokio::test]
async fn test_connection_failures_propagate() {
    let (kit, backend) = scripted_kit(None);
    backend.fail_connections();
    let mut session = kit.default_session().unwrap();

    let err = session
        .query_rows("SELECT 1", QueryOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SqlKitError::DatabaseError(_)));
    assert!(!session.is_connected());
}
