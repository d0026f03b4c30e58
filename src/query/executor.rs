//! Execution of validated queries.
//!
//! Only a [`ValidatedQuery`] can be executed here; the database client runs
//! it in a read-only transaction with a row cap.

use std::time::Instant;

use tracing::{info, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;
use crate::llm::ValidatedQuery;

/// Runs validated queries against a database.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    /// Executes `query` and returns its rows.
    pub async fn execute(&self, query: &ValidatedQuery) -> Result<QueryResult> {
        let start = Instant::now();
        let result = self.db.execute_query(query.as_str()).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(qr) => {
                info!(
                    rows = qr.row_count,
                    truncated = qr.was_truncated,
                    duration_ms = elapsed.as_millis() as u64,
                    "Query executed"
                );
            }
            Err(e) => warn!(error = %e, "Query execution failed"),
        }

        result
    }
}
