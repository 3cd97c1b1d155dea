//! Calls that resolve their SQL through the catalog

use crate::common::{count_row, scripted_kit, scripted_kit_with_catalog, user_rows, User};
use sqlkit::config::{ConfigLoader, SqlKitConfig};
use sqlkit::test_helpers::ScriptedBackend;
use sqlkit::{PageResult, QueryOptions, SqlKit};

#[tokio::test]
async fn test_named_query_uses_catalog_sql() {
    let (kit, backend) = scripted_kit_with_catalog(None);
    backend.push_rows(user_rows(2));
    let mut session = kit.default_session().unwrap();

    let users: Vec<User> = session
        .query_named("activeusers", QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(
        backend.executed()[0].sql,
        "SELECT id, name FROM users WHERE active"
    );
}

#[tokio::test]
async fn test_named_page_uses_count_and_data_pair() {
    let (kit, backend) = scripted_kit_with_catalog(None);
    backend.push_result_sets(vec![vec![count_row(12)], user_rows(5)]);
    let mut session = kit.default_session().unwrap();

    let page: PageResult<User> = session
        .query_page_named("UsersPage", 3, 5, QueryOptions::new())
        .await
        .unwrap();

    assert_eq!(page.total_page, 3);
    assert_eq!(page.page, 3);
    assert!(backend.executed()[0].sql.starts_with("SELECT count(*) FROM users;"));
}

#[tokio::test]
async fn test_named_execute_and_shape_mismatch() {
    let (kit, backend) = scripted_kit_with_catalog(None);
    backend.push_affected(1);
    let mut session = kit.default_session().unwrap();

    let affected = session
        .execute_named("DeactivateUser", QueryOptions::new().param("Id", 3))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let err = session
        .query_named::<User>("UsersPage", QueryOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_named_calls_without_catalog_fail() {
    let (kit, backend) = scripted_kit(None);
    let mut session = kit.default_session().unwrap();

    let err = session
        .query_named::<User>("ActiveUsers", QueryOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("catalog must be registered"));
    assert!(backend.connections().is_empty());
}

#[tokio::test]
async fn test_catalog_from_configuration() {
    let config: SqlKitConfig = ConfigLoader::from_str(
        r#"
connection_strings:
  DefaultConnection: "postgresql://app@primary/app"
queries:
  recent_orders: "SELECT id FROM orders ORDER BY id DESC LIMIT 10"
  orders_page:
    count: "SELECT count(*) FROM orders"
    data: "SELECT id FROM orders LIMIT @Take OFFSET @Skip"
"#,
        ::config::FileFormat::Yaml,
    )
    .unwrap();

    let backend = ScriptedBackend::new();
    backend.push_rows(vec![]);
    let kit = SqlKit::new(backend.clone(), &config).unwrap();
    let catalog = kit.catalog().unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.get_paging_sql("orders_page").is_ok());

    let mut session = kit.default_session().unwrap();
    let rows = session
        .query_rows_named("recent_orders", QueryOptions::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
}
