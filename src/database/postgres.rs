//! PostgreSQL backend built on `sqlx`.
//!
//! Each session owns one `PgConnection`. Named parameters are rewritten to
//! positional binds per statement, batches run statement by statement on the same
//! connection, and column values are decoded to JSON by PostgreSQL type name.

use super::row::Row;
use super::statement::{split_statements, to_positional, PositionalStatement};
use super::{DatabaseBackend, IsolationLevel, QueryConnection};
use crate::error::{SqlKitError, SqlKitResult};
use crate::params::Parameters;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, PgConnection, Postgres, Row as _, TypeInfo, ValueRef};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Connection factory for PostgreSQL
#[derive(Debug, Clone, Default)]
pub struct PostgresBackend;

impl PostgresBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DatabaseBackend for PostgresBackend {
    type Connection = PostgresConnection;

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self, connection_string: &str) -> SqlKitResult<PostgresConnection> {
        debug!(
            "Opening PostgreSQL connection: {}...",
            connection_string.chars().take(30).collect::<String>()
        );
        let conn = PgConnection::connect(connection_string).await?;
        Ok(PostgresConnection { conn })
    }
}

/// A single live PostgreSQL connection
pub struct PostgresConnection {
    conn: PgConnection,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection").finish_non_exhaustive()
    }
}

impl QueryConnection for PostgresConnection {
    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<Vec<Row>> {
        let statement = to_positional(sql, params)?;
        with_timeout(timeout, fetch_statement(&mut self.conn, &statement)).await
    }

    async fn fetch_multiple(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<Vec<Vec<Row>>> {
        let statements = split_statements(sql)
            .into_iter()
            .map(|text| to_positional(text, params))
            .collect::<SqlKitResult<Vec<_>>>()?;

        let conn = &mut self.conn;
        with_timeout(timeout, async move {
            let mut result_sets = Vec::with_capacity(statements.len());
            for statement in &statements {
                result_sets.push(fetch_statement(conn, statement).await?);
            }
            Ok(result_sets)
        })
        .await
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &Parameters,
        timeout: Option<Duration>,
    ) -> SqlKitResult<u64> {
        let statements = split_statements(sql)
            .into_iter()
            .map(|text| to_positional(text, params))
            .collect::<SqlKitResult<Vec<_>>>()?;

        let conn = &mut self.conn;
        with_timeout(timeout, async move {
            let mut affected = 0;
            for statement in &statements {
                let result = bind_all(sqlx::query(&statement.sql), &statement.values)
                    .execute(&mut *conn)
                    .await?;
                affected += result.rows_affected();
            }
            Ok(affected)
        })
        .await
    }

    async fn begin(&mut self, isolation: Option<IsolationLevel>) -> SqlKitResult<()> {
        let sql = match isolation {
            Some(level) => format!("BEGIN ISOLATION LEVEL {}", level.as_sql()),
            None => "BEGIN".to_string(),
        };
        self.conn.execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn commit(&mut self) -> SqlKitResult<()> {
        self.conn.execute(sqlx::raw_sql("COMMIT")).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> SqlKitResult<()> {
        self.conn.execute(sqlx::raw_sql("ROLLBACK")).await?;
        Ok(())
    }

    async fn close(self) -> SqlKitResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    operation: impl Future<Output = SqlKitResult<T>>,
) -> SqlKitResult<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| {
                SqlKitError::Timeout(format!("Command exceeded {}ms", limit.as_millis()))
            })?,
        None => operation.await,
    }
}

async fn fetch_statement(
    conn: &mut PgConnection,
    statement: &PositionalStatement,
) -> SqlKitResult<Vec<Row>> {
    let rows = bind_all(sqlx::query(&statement.sql), &statement.values)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(decode_row).collect()
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value.clone() {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => query.bind(s),
            composite => query.bind(sqlx::types::Json(composite)),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> SqlKitResult<Row> {
    let mut decoded = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, index, column.type_info().name())?;
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> SqlKitResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOL" => Value::from(row.try_get::<bool, _>(index)?),
        "INT2" => Value::from(row.try_get::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get::<i32, _>(index)?),
        "INT8" => Value::from(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            Value::from(row.try_get::<String, _>(index)?)
        }
        "JSON" | "JSONB" => row.try_get::<sqlx::types::Json<Value>, _>(index)?.0,
        "UUID" => Value::from(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "TIMESTAMPTZ" => Value::from(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "TIMESTAMP" => Value::from(
            row.try_get::<chrono::NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::from(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::from(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
        "TEXT[]" | "VARCHAR[]" => Value::from(row.try_get::<Vec<String>, _>(index)?),
        "INT4[]" => Value::from(row.try_get::<Vec<i32>, _>(index)?),
        "INT8[]" => Value::from(row.try_get::<Vec<i64>, _>(index)?),
        other => row
            .try_get::<String, _>(index)
            .map(Value::from)
            .map_err(|_| {
                SqlKitError::DatabaseError(format!(
                    "Unsupported column type {other} at index {index}; cast it to text in the query"
                ))
            })?,
    };

    Ok(value)
}
