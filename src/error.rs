//! Error types for sqlkit.
//!
//! Every fallible operation in the crate returns [`SqlKitResult`]. Cache backend
//! failures have their own type ([`crate::cache::CacheError`]) because the
//! orchestrator absorbs them instead of surfacing them to callers.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlKitError {
    /// Bad caller input: pagination bounds, row-count expectations, parameter shape
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Unknown connection names, missing replicas, blank connection strings, missing catalog
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Session misuse, e.g. commit without an active transaction
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Failures reported by the database driver
    #[error("Database error: {0}")]
    DatabaseError(String),
    /// Results or parameters that cannot be encoded/decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl SqlKitError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

impl From<serde_json::Error> for SqlKitError {
    fn from(error: serde_json::Error) -> Self {
        SqlKitError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for SqlKitError {
    fn from(err: sqlx::Error) -> Self {
        SqlKitError::DatabaseError(err.to_string())
    }
}

impl From<config::ConfigError> for SqlKitError {
    fn from(err: config::ConfigError) -> Self {
        SqlKitError::ConfigurationError(err.to_string())
    }
}

pub type SqlKitResult<T> = std::result::Result<T, SqlKitError>;
