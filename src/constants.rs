//! # System Constants
//!
//! Reserved names, defaults, and environment variable keys shared across sqlkit.

/// Parameter names injected into the parameter bag by the paging entry points.
///
/// Query text references these by name (e.g. `LIMIT @Take OFFSET @Skip`, or
/// `WHERE rn BETWEEN @TakeStart AND @TakeEnd`). A caller parameter with the same
/// name is overwritten.
pub mod paging_params {
    /// First row number of the page, 1-based (`skip + 1`)
    pub const TAKE_START: &str = "TakeStart";
    /// Last row number of the page (`page * page_size`)
    pub const TAKE_END: &str = "TakeEnd";
    /// Rows before the page (`(page - 1) * page_size`)
    pub const SKIP: &str = "Skip";
    /// Rows in the page (`page_size`)
    pub const TAKE: &str = "Take";
}

/// Template markers understood by the splicer
pub mod template {
    pub const BLOCK_START: char = '{';
    pub const BLOCK_END: char = '}';
    pub const ELSE_SEPARATOR: char = ':';
}

pub mod system {
    /// Connection name used when the caller does not name one
    pub const DEFAULT_CONNECTION_NAME: &str = "DefaultConnection";

    /// Statement separator appended between batched statements
    pub const STATEMENT_SEPARATOR: char = ';';

    /// Default prefix for derived cache keys
    pub const DEFAULT_CACHE_KEY_PREFIX: &str = "sqlkit";

    /// Default time-to-live for cached results, in seconds
    pub const DEFAULT_CACHE_EXPIRE_SECONDS: u64 = 60;

    /// Default entry capacity of the in-process cache
    pub const DEFAULT_CACHE_MAX_CAPACITY: u64 = 10_000;
}

/// Environment variables consulted by configuration and logging
pub mod env_vars {
    /// Selects the environment overlay (`development`, `test`, `production`)
    pub const SQLKIT_ENV: &str = "SQLKIT_ENV";
    pub const APP_ENV: &str = "APP_ENV";
    /// `json` switches console logging to JSON lines
    pub const SQLKIT_LOG_FORMAT: &str = "SQLKIT_LOG_FORMAT";
    /// Overrides the configuration directory
    pub const SQLKIT_CONFIG_DIR: &str = "SQLKIT_CONFIG_DIR";
    /// Prefix for per-key overrides, e.g. `SQLKIT__CACHE__EXPIRE_SECONDS=30`
    pub const OVERRIDE_PREFIX: &str = "SQLKIT";
    pub const OVERRIDE_SEPARATOR: &str = "__";
}
