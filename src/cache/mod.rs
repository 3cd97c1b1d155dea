//! # Query Result Cache
//!
//! Storage for serialized query results, keyed by [`CacheKeyBuilder`].
//!
//! ```text
//! CacheProvider (enum)
//!   ├── Moka(MokaCacheService)   <- in-process, per-entry TTL
//!   ├── NoOp(NoOpCacheService)   <- always miss, always succeed
//!   └── Custom(Arc<dyn DynCacheService>)  <- any caller CacheService
//! ```
//!
//! Backend errors never reach callers: the orchestrator logs them and carries on
//! as if the cache had missed.

pub mod errors;
pub mod key;
pub mod provider;
pub mod providers;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use key::{CacheKeyBuilder, DefaultCacheKeyBuilder};
pub use provider::{CacheProvider, DynCacheService};
pub use providers::{MokaCacheService, NoOpCacheService};
pub use traits::CacheService;
