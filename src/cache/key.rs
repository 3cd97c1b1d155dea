//! Cache key derivation
//!
//! A key is a pure function of the query text, the parameter bag and (for paged
//! queries) the page coordinates. Text and parameters are hashed with SHA-256 so
//! keys stay short and do not leak literal values into the cache.

use crate::constants::system::DEFAULT_CACHE_KEY_PREFIX;
use crate::orchestrator::PageRequest;
use crate::params::Parameters;
use sha2::{Digest, Sha256};

/// Strategy for turning a query call into a cache key.
///
/// Implementations must be deterministic: equal inputs always produce equal keys.
pub trait CacheKeyBuilder: Send + Sync + std::fmt::Debug {
    fn generate(
        &self,
        sql: &str,
        params: &Parameters,
        explicit_key: Option<&str>,
        page: Option<PageRequest>,
    ) -> String;
}

/// `{prefix}:{sha256(sql)}:{sha256(params)}` with `:p{page}:s{size}` appended
/// for paged calls. An explicit key is used verbatim.
#[derive(Debug, Clone)]
pub struct DefaultCacheKeyBuilder {
    prefix: String,
}

impl DefaultCacheKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for DefaultCacheKeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_KEY_PREFIX)
    }
}

impl CacheKeyBuilder for DefaultCacheKeyBuilder {
    fn generate(
        &self,
        sql: &str,
        params: &Parameters,
        explicit_key: Option<&str>,
        page: Option<PageRequest>,
    ) -> String {
        if let Some(key) = explicit_key {
            return key.to_string();
        }

        let mut key = format!(
            "{}:{}:{}",
            self.prefix,
            hex_digest(sql.as_bytes()),
            hex_digest(params.canonical_json().as_bytes())
        );
        if let Some(page) = page {
            key.push_str(&format!(":p{}:s{}", page.page(), page.page_size()));
        }
        key
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
