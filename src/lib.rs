#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # sqlkit
//!
//! Conditional SQL templates and cache-aside query execution with
//! primary/replica connection routing.
//!
//! ## Overview
//!
//! sqlkit sits between application code and a relational database driver and
//! adds two independent capabilities:
//!
//! - **Conditional templates**: `{...}` blocks in query text are kept or dropped
//!   per call (`{AND age > @Age}`), with `{then:else}` alternatives.
//! - **Cache-aside execution**: any query can be memoized behind a derived or
//!   explicit key, with per-call or configured TTLs. The same path routes reads
//!   to replicas and writes to the primary.
//!
//! ## Module Organization
//!
//! - [`template`] - Conditional block splicer
//! - [`cache`] - Cache service trait, providers and key derivation
//! - [`routing`] - Primary/replica connection routing
//! - [`orchestrator`] - Cache-aside execution and pagination
//! - [`database`] - Backend traits, dynamic rows and the PostgreSQL backend
//! - [`session`] - Caller-owned sessions and transactions
//! - [`catalog`] - Named SQL statements
//! - [`config`] - Configuration model and loading
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlkit::prelude::*;
//!
//! # async fn example() -> SqlKitResult<()> {
//! let config = ConfigLoader::load()?.into_config();
//! let kit = SqlKit::new(PostgresBackend::new(), &config)?;
//!
//! let mut session = kit.session(ConnectionTarget::replica("Reporting")?)?;
//! let page: PageResult<Row> = session
//!     .query_page(
//!         "SELECT count(*) FROM users",
//!         "SELECT id, name FROM users ORDER BY id LIMIT @Take OFFSET @Skip",
//!         1,
//!         20,
//!         QueryOptions::new().cache(true),
//!     )
//!     .await?;
//! println!("{} of {} pages", page.page, page.total_page);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod kit;
pub mod logging;
pub mod orchestrator;
pub mod params;
pub mod routing;
pub mod session;
pub mod template;
pub mod test_helpers;

pub use cache::{CacheKeyBuilder, CacheProvider, CacheService, DefaultCacheKeyBuilder};
pub use catalog::{CatalogEntry, SqlCatalog};
pub use config::{CacheSettings, ConfigLoader, MasterSlaveConfig, SqlKitConfig};
pub use database::{DatabaseBackend, IsolationLevel, QueryConnection, Row};
pub use error::{SqlKitError, SqlKitResult};
pub use kit::{SqlKit, SqlKitBuilder};
pub use orchestrator::{CacheDirective, PageRequest, PageResult, QueryOrchestrator};
pub use params::Parameters;
pub use routing::{ConnectionRole, ConnectionRouter, ConnectionTarget};
pub use session::{QueryOptions, Session};
pub use template::{splice, splice_with, unless, when, SqlTemplateExt};

#[cfg(feature = "postgres")]
pub use database::PostgresBackend;

/// Everything needed for typical use
pub mod prelude {
    pub use crate::config::{ConfigLoader, SqlKitConfig};
    pub use crate::database::{IsolationLevel, Row};
    pub use crate::error::{SqlKitError, SqlKitResult};
    pub use crate::kit::SqlKit;
    pub use crate::orchestrator::{CacheDirective, PageResult};
    pub use crate::params::Parameters;
    pub use crate::routing::ConnectionTarget;
    pub use crate::session::{QueryOptions, Session};
    pub use crate::template::SqlTemplateExt;

    #[cfg(feature = "postgres")]
    pub use crate::database::PostgresBackend;
}
