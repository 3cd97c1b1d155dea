//! # Execution Orchestrator
//!
//! Wraps a query future in the cache-aside protocol:
//!
//! ```text
//! enabled? ──no──▶ run query ──▶ return
//!    │yes
//!    ▼
//! derive key ─▶ cache get ──hit──▶ return cached value
//!                  │miss / error
//!                  ▼
//!             run query ─▶ cache set (ttl) ─▶ return
//! ```
//!
//! Caching is enabled for a call only when cache settings are configured; the
//! call's own flag then wins over `all_methods_enable_cache`. Cache backend
//! failures are logged and degrade to a miss or a skipped write. Query failures
//! propagate and are never cached.
//!
//! Concurrent misses for one key each run the query unless
//! `cache.single_flight` is set, in which case one caller runs it while the others
//! wait for the stored result.

pub mod pagination;

pub use pagination::{batch_sql, PageRequest, PageResult};

use crate::cache::{CacheKeyBuilder, CacheProvider, DefaultCacheKeyBuilder};
use crate::config::CacheSettings;
use crate::error::SqlKitResult;
use crate::params::Parameters;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-call cache options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDirective {
    /// `None` defers to `all_methods_enable_cache`
    pub enabled: Option<bool>,
    /// `None` uses the configured expiry
    pub ttl: Option<Duration>,
    /// Use this key verbatim instead of deriving one
    pub key: Option<String>,
}

impl CacheDirective {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self::default().enable(true)
    }

    pub fn disabled() -> Self {
        Self::default().enable(false)
    }

    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[derive(Debug)]
pub struct QueryOrchestrator {
    cache: CacheProvider,
    key_builder: Arc<dyn CacheKeyBuilder>,
    settings: Option<CacheSettings>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl QueryOrchestrator {
    pub fn new(
        cache: CacheProvider,
        key_builder: Arc<dyn CacheKeyBuilder>,
        settings: Option<CacheSettings>,
    ) -> Self {
        Self {
            cache,
            key_builder,
            settings,
            in_flight: DashMap::new(),
        }
    }

    /// In-memory cache sized by `settings`, or no cache when `settings` is `None`
    pub fn from_settings(settings: Option<CacheSettings>) -> Self {
        let cache = CacheProvider::from_settings(settings.as_ref());
        let key_builder: Arc<dyn CacheKeyBuilder> = match &settings {
            Some(settings) => Arc::new(DefaultCacheKeyBuilder::new(settings.key_prefix.clone())),
            None => Arc::new(DefaultCacheKeyBuilder::default()),
        };
        Self::new(cache, key_builder, settings)
    }

    pub fn settings(&self) -> Option<&CacheSettings> {
        self.settings.as_ref()
    }

    pub fn cache_provider(&self) -> &CacheProvider {
        &self.cache
    }

    /// Whether a call with the given flag goes through the cache
    pub fn is_cache_enabled(&self, enabled: Option<bool>) -> bool {
        self.settings
            .as_ref()
            .is_some_and(|settings| enabled.unwrap_or(settings.all_methods_enable_cache))
    }

    /// Run `query_fn` under the cache-aside protocol.
    ///
    /// `page` takes part in key derivation so different pages of the same
    /// query do not collide.
    pub async fn execute<T, F, Fut>(
        &self,
        directive: &CacheDirective,
        sql: &str,
        params: &Parameters,
        page: Option<PageRequest>,
        query_fn: F,
    ) -> SqlKitResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SqlKitResult<T>>,
    {
        let Some(settings) = self
            .settings
            .as_ref()
            .filter(|settings| directive.enabled.unwrap_or(settings.all_methods_enable_cache))
        else {
            return query_fn().await;
        };

        let key = self
            .key_builder
            .generate(sql, params, directive.key.as_deref(), page);
        let ttl = directive.ttl.unwrap_or_else(|| settings.expire());

        if let Some(cached) = self.lookup(&key).await {
            return Ok(cached);
        }

        if settings.single_flight {
            return self.execute_single_flight(key, ttl, query_fn).await;
        }

        let value = query_fn().await?;
        self.store(&key, &value, ttl).await?;
        Ok(value)
    }

    /// Remove a cached entry by key
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            warn!(key = key, error = %e, "Cache delete failed");
        }
    }

    async fn execute_single_flight<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        query_fn: F,
    ) -> SqlKitResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SqlKitResult<T>>,
    {
        let gate = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = async {
            let _turn = gate.lock().await;
            if let Some(cached) = self.lookup(&key).await {
                debug!(key = %key, "Single-flight waiter served from cache");
                return Ok(cached);
            }
            let value = query_fn().await?;
            self.store(&key, &value, ttl).await?;
            Ok(value)
        }
        .await;

        drop(gate);
        // Only the map still holds the gate: nobody else is waiting on it
        self.in_flight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);

        result
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key = key, "Query cache HIT");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Cached value could not be decoded, treating as miss");
                    None
                }
            },
            Ok(None) => {
                debug!(key = key, "Query cache MISS");
                None
            }
            Err(e) => {
                warn!(
                    key = key,
                    provider = self.cache.provider_name(),
                    error = %e,
                    "Cache lookup failed, treating as miss"
                );
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> SqlKitResult<()> {
        let encoded = serde_json::to_string(value)?;
        if let Err(e) = self.cache.set(key, &encoded, ttl).await {
            warn!(
                key = key,
                provider = self.cache.provider_name(),
                error = %e,
                "Cache write failed, result not cached"
            );
        }
        Ok(())
    }
}
