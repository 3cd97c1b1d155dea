//! # Test Helpers
//!
//! An in-memory [`DatabaseBackend`] that replays queued responses and records
//! everything it was asked to do. Used by the unit and integration tests to
//! exercise sessions, routing and caching without a database server.
//!
//! Statements are still validated the way a real backend would: every `@Name`
//! placeholder must be present in the parameter bag.

use crate::config::{CacheSettings, MasterSlaveConfig, SqlKitConfig};
use crate::constants::system::DEFAULT_CONNECTION_NAME;
use crate::database::statement::{split_statements, to_positional};
use crate::database::{DatabaseBackend, IsolationLevel, QueryConnection, Row};
use crate::error::{SqlKitError, SqlKitResult};
use crate::params::Parameters;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const PRIMARY_URL: &str = "postgresql://app@primary/app";
pub const REPLICA_URL: &str = "postgresql://app@replica/app";
pub const REPORTING_CONNECTION: &str = "Reporting";

/// What the next statement should produce
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// One entry per result set
    Rows(Vec<Vec<Row>>),
    Affected(u64),
    Error(SqlKitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    FetchAll,
    FetchMultiple,
    Execute,
}

/// A statement the backend was asked to run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub connection_string: String,
    pub kind: StatementKind,
    pub sql: String,
    pub params: Parameters,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: VecDeque<ScriptedResponse>,
    executed: Vec<ExecutedStatement>,
    connections: Vec<String>,
    transaction_log: Vec<String>,
    closed: usize,
    fail_connect: bool,
}

/// Scripted backend; clones share the same script and recordings
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a single result set
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.push(ScriptedResponse::Rows(vec![rows]))
    }

    /// Queue several result sets for one batch
    pub fn push_result_sets(&self, result_sets: Vec<Vec<Row>>) -> &Self {
        self.push(ScriptedResponse::Rows(result_sets))
    }

    pub fn push_affected(&self, rows_affected: u64) -> &Self {
        self.push(ScriptedResponse::Affected(rows_affected))
    }

    pub fn push_error(&self, error: SqlKitError) -> &Self {
        self.push(ScriptedResponse::Error(error))
    }

    pub fn push(&self, response: ScriptedResponse) -> &Self {
        self.state().responses.push_back(response);
        self
    }

    /// Make every subsequent `connect` fail
    pub fn fail_connections(&self) {
        self.state().fail_connect = true;
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().executed.clone()
    }

    pub fn execution_count(&self) -> usize {
        self.state().executed.len()
    }

    /// Connection strings passed to `connect`, in order
    pub fn connections(&self) -> Vec<String> {
        self.state().connections.clone()
    }

    /// `BEGIN ...`, `COMMIT` and `ROLLBACK` in the order they were issued
    pub fn transaction_log(&self) -> Vec<String> {
        self.state().transaction_log.clone()
    }

    pub fn closed_count(&self) -> usize {
        self.state().closed
    }

    pub fn pending_responses(&self) -> usize {
        self.state().responses.len()
    }
}

impl DatabaseBackend for ScriptedBackend {
    type Connection = ScriptedConnection;

    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn connect(&self, connection_string: &str) -> SqlKitResult<ScriptedConnection> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(SqlKitError::DatabaseError(format!(
                "connection refused: {connection_string}"
            )));
        }
        state.connections.push(connection_string.to_string());
        Ok(ScriptedConnection {
            connection_string: connection_string.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Connection handed out by [`ScriptedBackend`]
#[derive(Debug)]
pub struct ScriptedConnection {
    connection_string: String,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedConnection {
    fn run(
        &self,
        kind: StatementKind,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<Option<ScriptedResponse>> {
        for statement in split_statements(sql) {
            to_positional(statement, params)?;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.executed.push(ExecutedStatement {
            connection_string: self.connection_string.clone(),
            kind,
            sql: sql.to_string(),
            params: params.clone(),
            timeout,
        });
        match state.responses.pop_front() {
            Some(ScriptedResponse::Error(error)) => Err(error),
            other => Ok(other),
        }
    }

    fn log_transaction(&self, entry: String) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transaction_log
            .push(entry);
    }
}

impl QueryConnection for ScriptedConnection {
    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<Vec<Row>> {
        match self.run(StatementKind::FetchAll, sql, params, timeout)? {
            Some(ScriptedResponse::Rows(result_sets)) => {
                Ok(result_sets.into_iter().next().unwrap_or_default())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_multiple(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<Vec<Vec<Row>>> {
        match self.run(StatementKind::FetchMultiple, sql, params, timeout)? {
            Some(ScriptedResponse::Rows(result_sets)) => Ok(result_sets),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<u64> {
        match self.run(StatementKind::Execute, sql, params, timeout)? {
            Some(ScriptedResponse::Affected(rows_affected)) => Ok(rows_affected),
            _ => Ok(0),
        }
    }

    async fn begin(&mut self, isolation: Option<IsolationLevel>) -> SqlKitResult<()> {
        let entry = match isolation {
            Some(level) => format!("BEGIN ISOLATION LEVEL {}", level.as_sql()),
            None => "BEGIN".to_string(),
        };
        self.log_transaction(entry);
        Ok(())
    }

    async fn commit(&mut self) -> SqlKitResult<()> {
        self.log_transaction("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> SqlKitResult<()> {
        self.log_transaction("ROLLBACK".to_string());
        Ok(())
    }

    async fn close(self) -> SqlKitResult<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed += 1;
        Ok(())
    }
}

/// `DefaultConnection` on the primary plus a `Reporting` master-slave group
pub fn sample_config(cache: Option<CacheSettings>) -> SqlKitConfig {
    let mut config = SqlKitConfig::with_connection(DEFAULT_CONNECTION_NAME, PRIMARY_URL);
    config.master_slave.insert(
        REPORTING_CONNECTION.to_string(),
        MasterSlaveConfig {
            primary: PRIMARY_URL.to_string(),
            replicas: vec![REPLICA_URL.to_string()],
        },
    );
    config.cache = cache;
    config
}

/// Cache settings with every method cached by default
pub fn cache_everything() -> CacheSettings {
    CacheSettings {
        all_methods_enable_cache: true,
        ..CacheSettings::default()
    }
}
