//! Shared fixtures for the integration tests
#![allow(dead_code)]


use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlkit::catalog::{CatalogEntry, SqlCatalog};
use sqlkit::config::CacheSettings;
use sqlkit::test_helpers::{sample_config, ScriptedBackend};
use sqlkit::{Row, SqlKit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

pub fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", json!(id)), ("name", json!(name))])
}

pub fn user_rows(count: i64) -> Vec<Row> {
    (1..=count).map(|id| user_row(id, &format!("user-{id}"))).collect()
}

pub fn count_row(count: i64) -> Row {
    Row::from_pairs([("count", json!(count))])
}

/// Kit over a fresh scripted backend with the sample routes
pub fn scripted_kit(cache: Option<CacheSettings>) -> (SqlKit<ScriptedBackend>, ScriptedBackend) {
    let backend = ScriptedBackend::new();
    let kit = SqlKit::new(backend.clone(), &sample_config(cache)).expect("sample config is valid");
    (kit, backend)
}

/// Kit with a catalog holding `ActiveUsers` and `UsersPage`
pub fn scripted_kit_with_catalog(
    cache: Option<CacheSettings>,
) -> (SqlKit<ScriptedBackend>, ScriptedBackend) {
    let backend = ScriptedBackend::new();
    let catalog = SqlCatalog::new()
        .with(
            "ActiveUsers",
            CatalogEntry::statement("SELECT id, name FROM users WHERE active"),
        )
        .with(
            "UsersPage",
            CatalogEntry::paging(
                "SELECT count(*) FROM users",
                "SELECT id, name FROM users ORDER BY id LIMIT @Take OFFSET @Skip",
            ),
        )
        .with(
            "DeactivateUser",
            CatalogEntry::statement("UPDATE users SET active = false WHERE id = @Id"),
        );
    let kit = SqlKit::builder(backend.clone(), sample_config(cache))
        .catalog(catalog)
        .build()
        .expect("sample config is valid");
    (kit, backend)
}
