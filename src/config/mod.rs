//! # Configuration
//!
//! `SqlKitConfig` is the single configuration document for a kit: the
//! connection table, optional primary/replica groups, optional cache settings
//! and the named-SQL catalog.
//!
//! ```yaml
//! connection_strings:
//!   DefaultConnection: "postgresql://app@localhost/app"
//! master_slave:
//!   Reporting:
//!     primary: "postgresql://app@primary/app"
//!     replicas:
//!       - "postgresql://app@replica-1/app"
//! cache:
//!   expire_seconds: 60
//!   all_methods_enable_cache: false
//! queries:
//!   active_users: "SELECT * FROM users WHERE active"
//!   users_page:
//!     count: "SELECT count(*) FROM users"
//!     data: "SELECT * FROM users ORDER BY id LIMIT @Take OFFSET @Skip"
//! ```
//!
//! Loading (files plus `SQLKIT__*` environment overrides) lives in [`loader`].

pub mod loader;

pub use loader::ConfigLoader;

use crate::catalog::CatalogEntry;
use crate::constants::system::{
    DEFAULT_CACHE_EXPIRE_SECONDS, DEFAULT_CACHE_KEY_PREFIX, DEFAULT_CACHE_MAX_CAPACITY,
};
use crate::error::{SqlKitError, SqlKitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlKitConfig {
    /// Logical connection name to connection string
    pub connection_strings: HashMap<String, String>,
    /// Logical connection name to a primary/replica group
    pub master_slave: HashMap<String, MasterSlaveConfig>,
    /// Cache settings; absent means caching is disabled for every call
    pub cache: Option<CacheSettings>,
    /// Named SQL statements
    pub queries: HashMap<String, CatalogEntry>,
}

/// One writable primary and its read-only replicas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterSlaveConfig {
    pub primary: String,
    pub replicas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Default TTL for cached results
    pub expire_seconds: u64,
    /// Whether calls that do not say otherwise are cached
    pub all_methods_enable_cache: bool,
    pub max_capacity: u64,
    pub key_prefix: String,
    /// Let one caller run a missing query while concurrent callers for the same key wait
    pub single_flight: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expire_seconds: DEFAULT_CACHE_EXPIRE_SECONDS,
            all_methods_enable_cache: false,
            max_capacity: DEFAULT_CACHE_MAX_CAPACITY,
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            single_flight: false,
        }
    }
}

impl CacheSettings {
    pub fn expire(&self) -> Duration {
        Duration::from_secs(self.expire_seconds)
    }
}

impl SqlKitConfig {
    /// Convenience constructor for a single plain connection
    pub fn with_connection(name: impl Into<String>, connection_string: impl Into<String>) -> Self {
        let mut config = Self::default();
        config
            .connection_strings
            .insert(name.into(), connection_string.into());
        config
    }

    /// Check the document for values that can never work at runtime
    pub fn validate(&self) -> SqlKitResult<()> {
        for (name, connection_string) in &self.connection_strings {
            if connection_string.trim().is_empty() {
                return Err(SqlKitError::configuration(format!(
                    "Connection string for '{name}' is blank"
                )));
            }
        }

        for (name, group) in &self.master_slave {
            if group.primary.trim().is_empty() {
                return Err(SqlKitError::configuration(format!(
                    "Primary connection string for '{name}' is blank"
                )));
            }
            if group.replicas.iter().any(|r| r.trim().is_empty()) {
                return Err(SqlKitError::configuration(format!(
                    "Replica connection string for '{name}' is blank"
                )));
            }
            if group.replicas.is_empty() {
                warn!(
                    connection = %name,
                    "Master-slave connection has no replicas; read-only sessions will fail"
                );
            }
        }

        if let Some(cache) = &self.cache {
            if cache.expire_seconds == 0 {
                return Err(SqlKitError::configuration(
                    "Cache expire_seconds must be greater than 0",
                ));
            }
            if cache.max_capacity == 0 {
                warn!("Cache max_capacity is 0 - every result will be evicted immediately");
            }
        }

        for (name, entry) in &self.queries {
            if !entry.is_complete() {
                return Err(SqlKitError::configuration(format!(
                    "Query '{name}' has blank SQL text"
                )));
            }
        }

        Ok(())
    }

    /// Log a summary of the configuration without connection strings
    pub fn log_configuration(&self) {
        info!("SqlKit Configuration:");
        info!("  Connections: {}", self.connection_strings.len());
        for (name, group) in &self.master_slave {
            info!("  Master-slave '{}': {} replica(s)", name, group.replicas.len());
        }
        match &self.cache {
            Some(cache) => info!(
                "  Cache: {}s TTL, {} max entries, all methods: {}, single flight: {}",
                cache.expire_seconds,
                cache.max_capacity,
                cache.all_methods_enable_cache,
                cache.single_flight
            ),
            None => info!("  Cache: disabled"),
        }
        info!("  Catalog queries: {}", self.queries.len());
    }
}
