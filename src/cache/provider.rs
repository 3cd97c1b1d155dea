//! Cache provider with enum dispatch
//!
//! `CacheProvider` wraps the shipped backends in an enum so the orchestrator
//! holds one concrete type. Stores supplied by the caller go through
//! [`CacheProvider::custom`] and are dispatched through [`DynCacheService`].

use super::errors::CacheResult;
use super::providers::{MokaCacheService, NoOpCacheService};
use super::traits::CacheService;
use crate::config::CacheSettings;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = CacheResult<T>> + Send + 'a>>;

/// Object-safe form of [`CacheService`], implemented for every `CacheService`
pub trait DynCacheService: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;
    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> CacheFuture<'a, ()>;
    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()>;
    fn health_check(&self) -> CacheFuture<'_, bool>;
    fn provider_name(&self) -> &'static str;
}

impl<S: CacheService> DynCacheService for S {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(CacheService::get(self, key))
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(CacheService::set(self, key, value, ttl))
    }

    fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()> {
        Box::pin(CacheService::delete(self, key))
    }

    fn health_check(&self) -> CacheFuture<'_, bool> {
        Box::pin(CacheService::health_check(self))
    }

    fn provider_name(&self) -> &'static str {
        CacheService::provider_name(self)
    }
}

/// Cache backend selected at construction time
#[derive(Clone)]
pub enum CacheProvider {
    Moka(Box<MokaCacheService>),
    NoOp(NoOpCacheService),
    /// A caller-supplied store (Redis, memcached, ...)
    Custom(Arc<dyn DynCacheService>),
}

impl fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheProvider")
            .field(&self.provider_name())
            .finish()
    }
}

impl CacheProvider {
    /// Build the provider matching the cache settings.
    ///
    /// No settings means caching is off, which maps to the no-op backend.
    pub fn from_settings(settings: Option<&CacheSettings>) -> Self {
        match settings {
            Some(settings) => {
                info!(
                    backend = "moka",
                    max_capacity = settings.max_capacity,
                    expire_seconds = settings.expire_seconds,
                    "In-memory query cache initialized"
                );
                Self::moka(settings.max_capacity)
            }
            None => {
                info!("Query cache disabled by configuration");
                Self::noop()
            }
        }
    }

    pub fn moka(max_capacity: u64) -> Self {
        Self::Moka(Box::new(MokaCacheService::new(max_capacity)))
    }

    pub fn noop() -> Self {
        Self::NoOp(NoOpCacheService::new())
    }

    /// Wrap any [`CacheService`] implementation
    pub fn custom<S: CacheService + 'static>(service: S) -> Self {
        info!(
            backend = CacheService::provider_name(&service),
            "Custom query cache installed"
        );
        Self::Custom(Arc::new(service))
    }

    /// Whether this provider can ever return a hit
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::NoOp(_))
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Moka(svc) => CacheService::provider_name(svc.as_ref()),
            Self::NoOp(svc) => CacheService::provider_name(svc),
            Self::Custom(svc) => svc.provider_name(),
        }
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Moka(svc) => CacheService::get(svc.as_ref(), key).await,
            Self::NoOp(svc) => CacheService::get(svc, key).await,
            Self::Custom(svc) => svc.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Moka(svc) => CacheService::set(svc.as_ref(), key, value, ttl).await,
            Self::NoOp(svc) => CacheService::set(svc, key, value, ttl).await,
            Self::Custom(svc) => svc.set(key, value, ttl).await,
        }
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        match self {
            Self::Moka(svc) => CacheService::delete(svc.as_ref(), key).await,
            Self::NoOp(svc) => CacheService::delete(svc, key).await,
            Self::Custom(svc) => svc.delete(key).await,
        }
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        match self {
            Self::Moka(svc) => CacheService::health_check(svc.as_ref()).await,
            Self::NoOp(svc) => CacheService::health_check(svc).await,
            Self::Custom(svc) => svc.health_check().await,
        }
    }
}
