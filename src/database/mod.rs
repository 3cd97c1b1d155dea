//! # Database Backends
//!
//! The seam between sqlkit and a concrete storage driver.
//!
//! ## Overview
//!
//! The orchestrator and sessions are written only against two traits:
//!
//! - [`DatabaseBackend`] turns a resolved connection string into a live connection.
//!   There is one implementation per storage backend.
//! - [`QueryConnection`] runs statements on that connection and returns [`Row`]s.
//!
//! ## Key Components
//!
//! - [`row`] - Column-ordered dynamic rows with serde decoding
//! - [`statement`] - Named-parameter rewriting and batch splitting
//! - [`postgres`] - `sqlx` PostgreSQL backend (feature `postgres`)

pub mod row;
pub mod statement;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use row::Row;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresBackend, PostgresConnection};

use crate::error::SqlKitResult;
use crate::params::Parameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Transaction isolation levels understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A live connection able to run query text with named parameters.
///
/// `timeout` is a per-call command timeout; `None` means no limit.
pub trait QueryConnection: Send {
    /// Run a single statement and return its rows
    fn fetch_all(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> impl Future<Output = SqlKitResult<Vec<Row>>> + Send;

    /// Run a batch of `;`-separated statements and return one result set per statement
    fn fetch_multiple(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> impl Future<Output = SqlKitResult<Vec<Vec<Row>>>> + Send;

    /// Run a statement (or batch) and return the number of affected rows
    fn execute(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> impl Future<Output = SqlKitResult<u64>> + Send;

    fn begin(
        &mut self,
        isolation: Option<IsolationLevel>,
    ) -> impl Future<Output = SqlKitResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = SqlKitResult<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = SqlKitResult<()>> + Send;

    /// Close the connection gracefully
    fn close(self) -> impl Future<Output = SqlKitResult<()>> + Send;
}

/// Factory for physical connections of one storage backend
pub trait DatabaseBackend: Send + Sync + 'static {
    type Connection: QueryConnection;

    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    fn connect(
        &self,
        connection_string: &str,
    ) -> impl Future<Output = SqlKitResult<Self::Connection>> + Send;
}
