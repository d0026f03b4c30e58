//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::DatabaseConfig;
use crate::db::{DatabaseClient, ExplainError, QueryResult, Record, Schema, Table};
use crate::error::{InquireError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum rows to return from a query.
pub const MAX_ROWS: usize = 1000;

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    explain_timeout: Duration,
    query_timeout: Duration,
}

impl PostgresClient {
    /// Connects to the configured database, retrying transient failures.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let conn_str = config.connection_url()?;

        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!(database = %config.display_string(), "Connected to database");
                    return Ok(Self::from_pool(pool, config));
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(map_connection_error(e, config)),
            }
        }
    }

    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            explain_timeout: config.explain_timeout(),
            query_timeout: config.query_timeout(),
        }
    }

    /// Fetches the base tables of one namespace.
    async fn fetch_tables(&self, namespace: &str) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            InquireError::connection(format!("Failed to fetch tables in {namespace}: {e}"))
        })?;

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            let columns = self.fetch_columns(namespace, &table_name).await?;
            let table = columns.into_iter().fold(
                Table::new(table_name).in_namespace(namespace),
                |table, (name, data_type)| table.with_column(name, data_type),
            );
            tables.push(table);
        }

        Ok(tables)
    }

    /// Fetches `(name, data_type)` for each column of a table in ordinal order.
    async fn fetch_columns(
        &self,
        namespace: &str,
        table_name: &str,
    ) -> Result<Vec<(String, String)>> {
        sqlx::query_as(
            r#"
            SELECT column_name::text, data_type::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(namespace)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            InquireError::connection(format!("Failed to fetch columns for {table_name}: {e}"))
        })
    }

    /// Runs `sql` in a read-only transaction, returning each row as JSON text.
    async fn fetch_json_rows(&self, sql: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
        let wrapped = wrap_for_json(sql);

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        let rows: Vec<String> = sqlx::query_scalar(&wrapped).fetch_all(&mut *tx).await?;
        tx.rollback().await?;

        Ok(rows)
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn introspect_schema(&self, namespaces: &[String]) -> Result<Schema> {
        let mut schema = Schema::new();
        for namespace in namespaces {
            schema.tables.extend(self.fetch_tables(namespace).await?);
        }
        Ok(schema)
    }

    async fn explain(&self, sql: &str) -> std::result::Result<(), ExplainError> {
        let statement = format!("EXPLAIN {}", strip_terminator(sql));

        let result = tokio::time::timeout(
            self.explain_timeout,
            sqlx::query(&statement).execute(&self.pool),
        )
        .await
        .map_err(|_| {
            ExplainError::Transport(format!(
                "EXPLAIN timed out after {} seconds",
                self.explain_timeout.as_secs()
            ))
        })?;

        match result {
            Ok(_) => Ok(()),
            Err(e @ sqlx::Error::Database(_)) => Err(ExplainError::Rejected(format_query_error(e))),
            Err(e) => Err(ExplainError::Transport(e.to_string())),
        }
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let raw_rows = tokio::time::timeout(self.query_timeout, self.fetch_json_rows(sql))
            .await
            .map_err(|_| {
                InquireError::query(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| InquireError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let was_truncated = raw_rows.len() > MAX_ROWS;
        if was_truncated {
            warn!("Query returned more than {} rows, truncating", MAX_ROWS);
        }

        let rows = raw_rows
            .iter()
            .take(MAX_ROWS)
            .map(|raw| parse_record(raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult::from_records(rows)
            .with_execution_time(execution_time)
            .truncated(was_truncated))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Removes trailing whitespace and statement terminators.
fn strip_terminator(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Wraps a query so each row comes back as one JSON object, fetching one row
/// past the cap to detect truncation.
///
/// The closing parenthesis starts a new line so a trailing `--` comment in
/// the query cannot swallow it.
fn wrap_for_json(sql: &str) -> String {
    format!(
        "SELECT row_to_json(q)::text FROM ({}\n) AS q LIMIT {}",
        strip_terminator(sql),
        MAX_ROWS + 1
    )
}

fn parse_record(raw: &str) -> Result<Record> {
    serde_json::from_str(raw)
        .map_err(|e| InquireError::internal(format!("Malformed row from database: {e}")))
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();
    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &DatabaseConfig) -> InquireError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        InquireError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        InquireError::connection(format!(
            "Authentication failed for {target}. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        InquireError::connection(format!("Database for {target} does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        InquireError::connection(
            "Server requires SSL. Add '?sslmode=require' to the connection URL.",
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        InquireError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        InquireError::connection(error.to_string())
    }
}

/// Formats a database error with its detail and hint, when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

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
