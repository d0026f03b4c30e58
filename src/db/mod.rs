//! Database abstraction layer for db-inquire.
//!
//! Provides a trait-based interface for the three things the core needs from
//! a database: schema introspection, dry-run planning and execution.

mod cache;
mod mock;
mod postgres;
mod schema;
mod types;

pub use cache::SchemaCache;
pub use mock::MockDatabaseClient;
pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use types::{QueryResult, Record};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Why the database refused to plan a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainError {
    /// The planner rejected the statement (syntax or semantic error).
    /// Carries the database's own message.
    Rejected(String),
    /// The statement never reached the planner (pool, network, timeout).
    Transport(String),
}

impl fmt::Display for ExplainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(msg) | Self::Transport(msg) => f.write_str(msg),
        }
    }
}

/// Creates a PostgreSQL client for the given configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseClient>> {
    let client = PostgresClient::connect(config).await?;
    Ok(Arc::new(client))
}

/// Trait defining the interface for database clients.
///
/// Implementations are shared across concurrent requests, so every method
/// takes `&self` and acquires whatever connection it needs internally.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Lists tables and their columns for each of the given namespaces.
    async fn introspect_schema(&self, namespaces: &[String]) -> Result<Schema>;

    /// Asks the planner for an execution plan without running the statement.
    async fn explain(&self, sql: &str) -> std::result::Result<(), ExplainError>;

    /// Executes a read-only SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
