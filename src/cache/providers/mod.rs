//! Concrete cache backends

pub mod moka;
pub mod noop;

pub use self::moka::MokaCacheService;
pub use noop::NoOpCacheService;
