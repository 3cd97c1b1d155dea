//! # Sessions
//!
//! A [`Session`] is the caller-owned unit of work. It lazily opens one physical
//! connection for its [`ConnectionTarget`] and reuses it for every call,
//! including every statement inside a transaction.
//!
//! Query methods come in two flavors: ones taking SQL text and `*_named` ones
//! that look the text up in the kit's [`SqlCatalog`](crate::catalog::SqlCatalog).
//! `query*` methods go through the cache-aside orchestrator; `query_multiple`,
//! `execute` and `execute_scalar` always hit the database.
//!
//! ```no_run
//! # use sqlkit::prelude::*;
//! # async fn demo(kit: SqlKit<PostgresBackend>) -> SqlKitResult<()> {
//! let mut session = kit.default_session()?;
//! let sql = "SELECT id, name FROM users WHERE active {AND name = @Name}".splice(&[true]);
//! let rows = session
//!     .query_rows(&sql, QueryOptions::new().param("Name", "ada").cache(true))
//!     .await?;
//! session.close().await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

use crate::database::row::decode_rows;
use crate::database::{DatabaseBackend, IsolationLevel, QueryConnection, Row};
use crate::error::{SqlKitError, SqlKitResult};
use crate::kit::SqlKit;
use crate::logging::log_query_operation;
use crate::orchestrator::{batch_sql, CacheDirective, PageRequest, PageResult};
use crate::params::Parameters;
use crate::routing::ConnectionTarget;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Parameters, command timeout and cache options for one call
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub params: Parameters,
    pub timeout: Option<Duration>,
    pub cache: CacheDirective,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Turn caching on or off for this call, overriding `all_methods_enable_cache`
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache.enabled = Some(enabled);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = Some(ttl);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache.key = Some(key.into());
        self
    }

    pub fn directive(mut self, directive: CacheDirective) -> Self {
        self.cache = directive;
        self
    }
}

impl From<Parameters> for QueryOptions {
    fn from(params: Parameters) -> Self {
        Self::new().params(params)
    }
}

pub struct Session<B: DatabaseBackend> {
    kit: SqlKit<B>,
    target: ConnectionTarget,
    connection: Option<B::Connection>,
    in_transaction: bool,
}

impl<B: DatabaseBackend> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("connected", &self.connection.is_some())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl<B: DatabaseBackend> Session<B> {
    pub(crate) fn new(kit: SqlKit<B>, target: ConnectionTarget) -> Self {
        Self {
            kit,
            target,
            connection: None,
            in_transaction: false,
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn connection(&mut self) -> SqlKitResult<&mut B::Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                let connection_string = self
                    .kit
                    .router()
                    .resolve(self.target.name(), self.target.role())?;
                let connection = self.kit.backend().connect(&connection_string).await?;
                debug!(
                    backend = self.kit.backend().name(),
                    connection = self.target.name(),
                    role = %self.target.role(),
                    "Connection opened"
                );
                connection
            }
        };
        Ok(self.connection.insert(connection))
    }

    // ----- queries -----

    /// All rows of `sql`, decoded into `T`
    pub async fn query<T>(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let kit = self.kit.clone();
        let QueryOptions {
            params,
            timeout,
            cache,
        } = options;
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, sql, bag, None, move || async move {
                let conn = self.connection().await?;
                let rows = conn.fetch_all(sql, bag, timeout).await?;
                decode_rows(&rows)
            })
            .await
    }

    /// All rows of `sql` as dynamic [`Row`]s
    pub async fn query_rows(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<Vec<Row>> {
        let kit = self.kit.clone();
        let QueryOptions {
            params,
            timeout,
            cache,
        } = options;
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, sql, bag, None, move || async move {
                let conn = self.connection().await?;
                conn.fetch_all(sql, bag, timeout).await
            })
            .await
    }

    /// First row of `sql`, if any
    pub async fn query_first<T>(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let kit = self.kit.clone();
        let QueryOptions {
            params,
            timeout,
            cache,
        } = options;
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, sql, bag, None, move || async move {
                let conn = self.connection().await?;
                let rows = conn.fetch_all(sql, bag, timeout).await?;
                rows.first().map(Row::decode::<T>).transpose()
            })
            .await
    }

    /// The only row of `sql`, if any. More than one row is a validation error.
    pub async fn query_single<T>(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let kit = self.kit.clone();
        let QueryOptions {
            params,
            timeout,
            cache,
        } = options;
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, sql, bag, None, move || async move {
                let conn = self.connection().await?;
                let rows = conn.fetch_all(sql, bag, timeout).await?;
                if rows.len() > 1 {
                    return Err(SqlKitError::validation(format!(
                        "Expected at most one row, query returned {}",
                        rows.len()
                    )));
                }
                rows.first().map(Row::decode::<T>).transpose()
            })
            .await
    }

    /// One page of `data_sql` together with the total from `count_sql`.
    ///
    /// Both statements run as one batch. The reserved parameters `Skip`, `Take`,
    /// `TakeStart` and `TakeEnd` are available to both.
    pub async fn query_page<T>(
        &mut self,
        count_sql: &str,
        data_sql: &str,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> SqlKitResult<PageResult<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let request = PageRequest::new(page, page_size)?;
        let kit = self.kit.clone();
        let QueryOptions {
            mut params,
            timeout,
            cache,
        } = options;
        request.inject(&mut params);
        let sql = batch_sql(count_sql, data_sql);
        let batch = sql.as_str();
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, batch, bag, Some(request), move || async move {
                let conn = self.connection().await?;
                let mut result_sets = conn.fetch_multiple(batch, bag, timeout).await?.into_iter();
                let total_count = result_sets
                    .next()
                    .and_then(|rows| rows.into_iter().next())
                    .map(|row| row.decode_scalar::<i64>())
                    .transpose()?
                    .unwrap_or(0);
                let data = result_sets.next().unwrap_or_default();
                Ok(PageResult::new(
                    decode_rows(&data)?,
                    request,
                    u64::try_from(total_count).unwrap_or(0),
                ))
            })
            .await
    }

    /// One page of `sql` without a total count
    pub async fn query_plain_page<T>(
        &mut self,
        sql: &str,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> SqlKitResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let request = PageRequest::new(page, page_size)?;
        let kit = self.kit.clone();
        let QueryOptions {
            mut params,
            timeout,
            cache,
        } = options;
        request.inject(&mut params);
        let bag = &params;

        kit.orchestrator()
            .execute(&cache, sql, bag, Some(request), move || async move {
                let conn = self.connection().await?;
                let rows = conn.fetch_all(sql, bag, timeout).await?;
                decode_rows(&rows)
            })
            .await
    }

    /// Every result set of a `;`-separated batch. Never cached.
    pub async fn query_multiple(
        &mut self,
        sql: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Vec<Vec<Row>>> {
        let conn = self.connection().await?;
        conn.fetch_multiple(sql, &options.params, options.timeout).await
    }

    /// Run a statement and return the affected row count. Never cached.
    pub async fn execute(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<u64> {
        let conn = self.connection().await?;
        let rows_affected = conn.execute(sql, &options.params, options.timeout).await?;
        log_query_operation(
            "execute",
            self.target.name(),
            "success",
            Some(rows_affected),
            None,
        );
        Ok(rows_affected)
    }

    /// First column of the first row. Never cached.
    pub async fn execute_scalar<T>(&mut self, sql: &str, options: QueryOptions) -> SqlKitResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let conn = self.connection().await?;
        let rows = conn.fetch_all(sql, &options.params, options.timeout).await?;
        match rows.first() {
            Some(row) if !row.get_index(0).is_some_and(Value::is_null) => {
                row.decode_scalar().map(Some)
            }
            _ => Ok(None),
        }
    }

    // ----- catalog -----

    fn catalog_sql(&self, name: &str) -> SqlKitResult<String> {
        self.registered_catalog()?.get_sql(name).map(str::to_string)
    }

    fn catalog_paging_sql(&self, name: &str) -> SqlKitResult<(String, String)> {
        let (count, data) = self.registered_catalog()?.get_paging_sql(name)?;
        Ok((count.to_string(), data.to_string()))
    }

    fn registered_catalog(&self) -> SqlKitResult<&crate::catalog::SqlCatalog> {
        self.kit.catalog().ok_or_else(|| {
            SqlKitError::configuration(
                "A SQL catalog must be registered before calling methods by query name",
            )
        })
    }

    pub async fn query_named<T>(&mut self, name: &str, options: QueryOptions) -> SqlKitResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let sql = self.catalog_sql(name)?;
        self.query(&sql, options).await
    }

    pub async fn query_rows_named(
        &mut self,
        name: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Vec<Row>> {
        let sql = self.catalog_sql(name)?;
        self.query_rows(&sql, options).await
    }

    pub async fn query_first_named<T>(
        &mut self,
        name: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let sql = self.catalog_sql(name)?;
        self.query_first(&sql, options).await
    }

    pub async fn query_single_named<T>(
        &mut self,
        name: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let sql = self.catalog_sql(name)?;
        self.query_single(&sql, options).await
    }

    /// Page through a catalog entry holding a count/data pair
    pub async fn query_page_named<T>(
        &mut self,
        name: &str,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> SqlKitResult<PageResult<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let (count_sql, data_sql) = self.catalog_paging_sql(name)?;
        self.query_page(&count_sql, &data_sql, page, page_size, options)
            .await
    }

    pub async fn query_plain_page_named<T>(
        &mut self,
        name: &str,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> SqlKitResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let sql = self.catalog_sql(name)?;
        self.query_plain_page(&sql, page, page_size, options).await
    }

    pub async fn query_multiple_named(
        &mut self,
        name: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Vec<Vec<Row>>> {
        let sql = self.catalog_sql(name)?;
        self.query_multiple(&sql, options).await
    }

    pub async fn execute_named(&mut self, name: &str, options: QueryOptions) -> SqlKitResult<u64> {
        let sql = self.catalog_sql(name)?;
        self.execute(&sql, options).await
    }

    pub async fn execute_scalar_named<T>(
        &mut self,
        name: &str,
        options: QueryOptions,
    ) -> SqlKitResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let sql = self.catalog_sql(name)?;
        self.execute_scalar(&sql, options).await
    }

    // ----- transactions -----

    /// Start a transaction on this session's connection
    pub async fn begin_transaction(&mut self, isolation: Option<IsolationLevel>) -> SqlKitResult<()> {
        if self.in_transaction {
            return Err(SqlKitError::invalid_state(
                "A transaction is already active on this session",
            ));
        }
        let conn = self.connection().await?;
        conn.begin(isolation).await?;
        self.in_transaction = true;
        let isolation = isolation.map(|level| level.to_string());
        log_query_operation(
            "begin_transaction",
            self.target.name(),
            "success",
            None,
            isolation.as_deref(),
        );
        Ok(())
    }

    pub async fn commit_transaction(&mut self) -> SqlKitResult<()> {
        let conn = self.active_transaction()?;
        conn.commit().await?;
        self.in_transaction = false;
        log_query_operation("commit_transaction", self.target.name(), "success", None, None);
        Ok(())
    }

    pub async fn rollback_transaction(&mut self) -> SqlKitResult<()> {
        let conn = self.active_transaction()?;
        conn.rollback().await?;
        self.in_transaction = false;
        log_query_operation("rollback_transaction", self.target.name(), "success", None, None);
        Ok(())
    }

    fn active_transaction(&mut self) -> SqlKitResult<&mut B::Connection> {
        match self.connection.as_mut() {
            Some(conn) if self.in_transaction => Ok(conn),
            _ => Err(SqlKitError::invalid_state(
                "begin_transaction must be called first",
            )),
        }
    }

    /// Release the connection. An open transaction is rolled back first.
    pub async fn close(mut self) -> SqlKitResult<()> {
        if self.in_transaction {
            warn!(
                connection = self.target.name(),
                "Session closed with an open transaction, rolling back"
            );
            self.rollback_transaction().await?;
        }
        match self.connection.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }
}

impl<B: DatabaseBackend> Drop for Session<B> {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!(
                connection = self.target.name(),
                "Session dropped with an open transaction; the driver will roll it back"
            );
        }
    }
}
