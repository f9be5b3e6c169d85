//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait using sqlx. Each query runs on its own pooled connection inside a
//! read-only transaction that is rolled back afterwards.

use crate::config::DatabaseConfig;
use crate::db::{decimal_to_value, DatabaseClient, ResultRow, ResultSet, Value};
use crate::error::{AskError, Result};
use crate::safety::SafeQuery;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Time allowed for acquiring a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Extra time the client waits past the server-side statement timeout.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    statement_timeout: Duration,
    max_rows: usize,
}

impl PostgresClient {
    /// Connects to the database described by `config`.
    ///
    /// Makes a single attempt; connection failures are reported, not retried.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let conn_str = config.connection_string()?;
        debug!("Connecting to {}", config.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self::from_pool(pool, config))
    }

    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            statement_timeout: Duration::from_secs(config.statement_timeout_secs),
            max_rows: config.max_rows,
        }
    }

    /// Runs `sql` in a read-only transaction and keeps at most `max_rows + 1` rows.
    ///
    /// The extra row only signals truncation. PostgreSQL enforces the
    /// statement timeout itself; the client-side timer is a backstop for a
    /// server that stops responding.
    async fn fetch_read_only(&self, sql: &str) -> Result<Vec<PgRow>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AskError::query(format!("Failed to open session: {e}")))?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| AskError::query(format_query_error(e)))?;

        // SET does not accept bind parameters; the value is an integer.
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| AskError::query(format_query_error(e)))?;

        let limit = self.max_rows.saturating_add(1);
        let fetch = async {
            let mut stream = sqlx::query(sql).fetch(&mut *tx);
            let mut rows = Vec::new();
            while rows.len() < limit {
                match stream.try_next().await? {
                    Some(row) => rows.push(row),
                    None => break,
                }
            }
            Ok::<_, sqlx::Error>(rows)
        };

        let rows = tokio::time::timeout(self.statement_timeout + CLIENT_TIMEOUT_GRACE, fetch)
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| {
                if is_statement_timeout(&e) {
                    self.timeout_error()
                } else {
                    AskError::query(format_query_error(e))
                }
            })?;

        if let Err(e) = tx.rollback().await {
            warn!("Failed to roll back read-only transaction: {e}");
        }

        Ok(rows)
    }

    fn timeout_error(&self) -> AskError {
        AskError::query(format!(
            "Query timed out after {} seconds",
            self.statement_timeout.as_secs()
        ))
    }
}

/// SQLSTATE 57014 is raised when `statement_timeout` cancels a query.
fn is_statement_timeout(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .is_some_and(|code| code == "57014")
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, query: &SafeQuery) -> Result<ResultSet> {
        let start = Instant::now();
        let result = self.fetch_read_only(query.as_str()).await?;
        let execution_time = start.elapsed();

        let columns: Vec<String> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > self.max_rows;

        if was_truncated {
            warn!(
                "Query returned more than {} rows, truncating",
                self.max_rows
            );
        }

        let rows: Vec<ResultRow> = result
            .iter()
            .take(self.max_rows)
            .map(convert_row)
            .collect();

        Ok(ResultSet {
            columns,
            rows,
            execution_time,
            total_rows,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx PgRow to our ResultRow type.
fn convert_row(row: &PgRow) -> ResultRow {
    let mut converted = ResultRow::new();
    for (i, col) in row.columns().iter().enumerate() {
        converted.push(col.name(), convert_value(row, i, col.type_info().name()));
    }
    converted
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        // AVG() over integer columns also lands here.
        "NUMERIC" | "DECIMAL" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .ok()
            .flatten()
            .map(|v| decimal_to_value(&v))
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| Value::String(STANDARD.encode(bytes)))
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to readable messages.
fn map_connection_error(error: sqlx::Error, config: &DatabaseConfig) -> AskError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        AskError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        AskError::connection(format!(
            "Authentication failed for {target}. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        AskError::connection(format!("Database for {target} does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        AskError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        AskError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
