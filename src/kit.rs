//! The shared entry point.
//!
//! A [`SqlKit`] owns everything that outlives a single unit of work: the
//! backend, the routing table, the orchestrator (cache provider, key builder,
//! cache settings) and the optional SQL catalog. It is cheap to clone and hands
//! out caller-owned [`Session`]s.

use crate::cache::{CacheKeyBuilder, CacheProvider, DefaultCacheKeyBuilder};
use crate::catalog::SqlCatalog;
use crate::config::SqlKitConfig;
use crate::database::DatabaseBackend;
use crate::error::{SqlKitError, SqlKitResult};
use crate::orchestrator::QueryOrchestrator;
use crate::routing::{ConnectionRouter, ConnectionTarget};
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
struct KitInner<B> {
    backend: B,
    router: ConnectionRouter,
    orchestrator: QueryOrchestrator,
    catalog: Option<SqlCatalog>,
}

pub struct SqlKit<B: DatabaseBackend> {
    inner: Arc<KitInner<B>>,
}

impl<B: DatabaseBackend> Clone for SqlKit<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: DatabaseBackend + std::fmt::Debug> std::fmt::Debug for SqlKit<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlKit")
            .field("backend", &self.inner.backend)
            .field("routes", &self.inner.router.summaries().len())
            .field("cache", &self.inner.orchestrator.cache_provider().provider_name())
            .field("catalog", &self.inner.catalog.as_ref().map(SqlCatalog::len))
            .finish()
    }
}

impl<B: DatabaseBackend> SqlKit<B> {
    /// Validate `config` and build a kit with the in-memory cache and default keys
    pub fn new(backend: B, config: &SqlKitConfig) -> SqlKitResult<Self> {
        Self::builder(backend, config.clone()).build()
    }

    pub fn builder(backend: B, config: SqlKitConfig) -> SqlKitBuilder<B> {
        SqlKitBuilder {
            backend,
            config,
            cache: None,
            key_builder: None,
            catalog: None,
        }
    }

    /// Open a session for `target`.
    ///
    /// The target's connection must be configured, and a master-slave target
    /// needs a master-slave entry. The physical connection is opened lazily.
    pub fn session(&self, target: ConnectionTarget) -> SqlKitResult<Session<B>> {
        let router = &self.inner.router;
        if !router.contains(target.name()) {
            return Err(SqlKitError::configuration(format!(
                "Unknown connection name '{}'",
                target.name()
            )));
        }
        if target.enable_master_slave() && !router.has_master_slave(target.name()) {
            return Err(SqlKitError::configuration(format!(
                "Master-slave routing is enabled for '{}' but no master_slave entry is configured",
                target.name()
            )));
        }

        debug!(
            connection = target.name(),
            role = %target.role(),
            "Session created"
        );
        Ok(Session::new(self.clone(), target))
    }

    /// Session on `DefaultConnection`, primary role
    pub fn default_session(&self) -> SqlKitResult<Session<B>> {
        self.session(ConnectionTarget::default())
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn router(&self) -> &ConnectionRouter {
        &self.inner.router
    }

    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.inner.orchestrator
    }

    pub fn catalog(&self) -> Option<&SqlCatalog> {
        self.inner.catalog.as_ref()
    }

    /// Drop a cached result stored under an explicit key
    pub async fn invalidate_cache(&self, key: &str) {
        self.inner.orchestrator.invalidate(key).await;
    }
}

/// Builder for a [`SqlKit`] with a custom cache provider, key builder or catalog
pub struct SqlKitBuilder<B: DatabaseBackend> {
    backend: B,
    config: SqlKitConfig,
    cache: Option<CacheProvider>,
    key_builder: Option<Arc<dyn CacheKeyBuilder>>,
    catalog: Option<SqlCatalog>,
}

impl<B: DatabaseBackend> SqlKitBuilder<B> {
    pub fn cache_provider(mut self, cache: CacheProvider) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn key_builder(mut self, key_builder: Arc<dyn CacheKeyBuilder>) -> Self {
        self.key_builder = Some(key_builder);
        self
    }

    /// Register a catalog. Entries from `queries:` in the configuration are
    /// added to it; on a name clash the registered entry wins.
    pub fn catalog(mut self, catalog: SqlCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> SqlKitResult<SqlKit<B>> {
        self.config.validate()?;

        let settings = self.config.cache.clone();
        let cache = self
            .cache
            .unwrap_or_else(|| CacheProvider::from_settings(settings.as_ref()));
        let key_builder = self.key_builder.unwrap_or_else(|| {
            let prefix = settings
                .as_ref()
                .map(|s| s.key_prefix.clone())
                .unwrap_or_else(|| DefaultCacheKeyBuilder::default().prefix().to_string());
            Arc::new(DefaultCacheKeyBuilder::new(prefix))
        });

        let catalog = match self.catalog {
            Some(mut catalog) => {
                for (name, entry) in &self.config.queries {
                    if !catalog.contains(name) {
                        catalog.register(name, entry.clone());
                    }
                }
                Some(catalog)
            }
            None if self.config.queries.is_empty() => None,
            None => Some(SqlCatalog::from_entries(&self.config.queries)),
        };

        let router = ConnectionRouter::from_config(&self.config);
        let orchestrator = QueryOrchestrator::new(cache, key_builder, settings);

        info!(
            backend = self.backend.name(),
            routes = router.summaries().len(),
            cache = orchestrator.cache_provider().provider_name(),
            catalog_entries = catalog.as_ref().map_or(0, SqlCatalog::len),
            "SqlKit initialized"
        );

        Ok(SqlKit {
            inner: Arc::new(KitInner {
                backend: self.backend,
                router,
                orchestrator,
                catalog,
            }),
        })
    }
}
