//! Cache providers and key derivation through the public API

use crate::common::user_rows;
use serde_json::json;
use sqlkit::cache::{
    CacheError, CacheKeyBuilder, CacheProvider, CacheResult, CacheService, DefaultCacheKeyBuilder,
};
use sqlkit::config::CacheSettings;
use sqlkit::orchestrator::PageRequest;
use sqlkit::test_helpers::{cache_everything, sample_config, ScriptedBackend};
use sqlkit::{Parameters, QueryOptions, SqlKit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store shared with the test so writes can be inspected
#[derive(Debug, Clone, Default)]
struct SharedStore {
    entries: Arc<Mutex<HashMap<String, (String, Duration)>>>,
    reject_writes: bool,
}

impl CacheService for SharedStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if self.reject_writes {
            return Err(CacheError::BackendError("read-only replica".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "shared"
    }
}

fn kit_with_store(store: SharedStore) -> (SqlKit<ScriptedBackend>, ScriptedBackend) {
    let backend = ScriptedBackend::new();
    let kit = SqlKit::builder(backend.clone(), sample_config(Some(cache_everything())))
        .cache_provider(CacheProvider::custom(store))
        .build()
        .unwrap();
    (kit, backend)
}

#[test]
fn test_keys_ignore_parameter_insertion_order() {
    let builder = DefaultCacheKeyBuilder::default();
    let a = Parameters::new()
        .with("Name", "ada")
        .with("Filter", json!({"min": 1, "max": 9}));
    let b = Parameters::new()
        .with("Filter", json!({"max": 9, "min": 1}))
        .with("Name", "ada");

    assert_eq!(
        builder.generate("SELECT 1", &a, None, None),
        builder.generate("SELECT 1", &b, None, None)
    );
}

#[test]
fn test_keys_separate_queries_pages_and_prefixes() {
    let params = Parameters::new();
    let default = DefaultCacheKeyBuilder::default();
    let tenant = DefaultCacheKeyBuilder::new("tenant-7");

    let base = default.generate("SELECT 1", &params, None, None);
    assert_ne!(base, default.generate("SELECT 2", &params, None, None));
    assert_ne!(
        base,
        default.generate("SELECT 1", &params, None, PageRequest::new(1, 10).ok())
    );
    assert!(tenant
        .generate("SELECT 1", &params, None, None)
        .starts_with("tenant-7:"));
    assert_eq!(
        default.generate("SELECT 1", &params, Some("explicit"), PageRequest::new(2, 5).ok()),
        "explicit"
    );
}

#[tokio::test]
async fn test_provider_from_settings_round_trip() {
    let provider = CacheProvider::from_settings(Some(&CacheSettings::default()));
    assert!(provider.is_enabled());

    provider
        .set("users", r#"[{"id":1}]"#, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(
        provider.get("users").await.unwrap().as_deref(),
        Some(r#"[{"id":1}]"#)
    );
}

#[tokio::test]
async fn test_noop_provider_never_hits() {
    let provider = CacheProvider::from_settings(None);
    provider
        .set("users", "[]", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(provider.get("users").await.unwrap(), None);
    assert!(provider.health_check().await.unwrap());
}

#[tokio::test]
async fn test_custom_store_serves_session_queries() {
    let store = SharedStore::default();
    let (kit, backend) = kit_with_store(store.clone());
    backend.push_rows(user_rows(2));
    let mut session = kit.default_session().unwrap();

    for _ in 0..2 {
        let rows = session
            .query_rows(
                "SELECT id, name FROM users",
                QueryOptions::new()
                    .cache_key("users:all")
                    .cache_ttl(Duration::from_secs(30)),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    assert_eq!(backend.execution_count(), 1);
    assert_eq!(kit.orchestrator().cache_provider().provider_name(), "shared");
    let entries = store.entries.lock().unwrap();
    assert_eq!(entries.get("users:all").map(|(_, ttl)| *ttl), Some(Duration::from_secs(30)));
    drop(entries);

    kit.invalidate_cache("users:all").await;
    assert!(store.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_custom_writes_still_return_results() {
    let store = SharedStore {
        reject_writes: true,
        ..SharedStore::default()
    };
    let (kit, backend) = kit_with_store(store.clone());
    backend.push_rows(user_rows(1)).push_rows(user_rows(1));
    let mut session = kit.default_session().unwrap();

    for _ in 0..2 {
        let rows = session
            .query_rows("SELECT id, name FROM users", QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    assert_eq!(backend.execution_count(), 2);
    assert!(store.entries.lock().unwrap().is_empty());
}
