//! Cache service trait definition

use super::errors::CacheResult;
use std::time::Duration;

/// Operations every cache backend provides.
///
/// Values are opaque strings; the orchestrator owns (de)serialization. All
/// operations are async and return `CacheResult` so that a failing backend can be
/// degraded to a miss by the caller.
pub trait CacheService: Send + Sync {
    /// Get a value from the cache by key
    ///
    /// Returns `Ok(Some(value))` on a hit and `Ok(None)` on a miss or expiry.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Store a value that expires after `ttl`
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    fn provider_name(&self) -> &'static str;
}
