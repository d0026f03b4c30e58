//! Mock database client for testing.
//!
//! Provides a scripted, in-memory database so the generation loop can be
//! exercised without PostgreSQL.

use super::{DatabaseClient, ExplainError, QueryResult, Schema};
use crate::error::{InquireError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A mock database client that returns predefined results.
///
/// `explain` pops outcomes from a script; once the script is empty every
/// statement is accepted.
#[derive(Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    explain_script: Mutex<VecDeque<std::result::Result<(), ExplainError>>>,
    query_result: QueryResult,
    query_error: Option<String>,
    introspect_delay: Option<Duration>,
    introspect_error: Option<String>,
    introspect_calls: AtomicUsize,
    explained: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Queues outcomes for successive `explain` calls.
    pub fn with_explain_results(
        self,
        results: impl IntoIterator<Item = std::result::Result<(), ExplainError>>,
    ) -> Self {
        lock(&self.explain_script).extend(results);
        self
    }

    /// Sets the result returned by `execute_query`.
    pub fn with_query_result(mut self, result: QueryResult) -> Self {
        self.query_result = result;
        self
    }

    /// Makes `execute_query` fail with the given message.
    pub fn with_query_error(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    /// Makes each introspection take `delay` before returning.
    pub fn with_introspect_delay(mut self, delay: Duration) -> Self {
        self.introspect_delay = Some(delay);
        self
    }

    /// Makes introspection fail with the given message.
    pub fn with_introspect_error(mut self, message: impl Into<String>) -> Self {
        self.introspect_error = Some(message.into());
        self
    }

    /// Number of times `introspect_schema` was called.
    pub fn introspect_calls(&self) -> usize {
        self.introspect_calls.load(Ordering::SeqCst)
    }

    /// Statements passed to `explain`, in call order.
    pub fn explained(&self) -> Vec<String> {
        lock(&self.explained).clone()
    }

    /// Statements passed to `execute_query`, in call order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self, namespaces: &[String]) -> Result<Schema> {
        self.introspect_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.introspect_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.introspect_error {
            return Err(InquireError::connection(message.clone()));
        }

        let tables = self
            .schema
            .tables
            .iter()
            .filter(|table| namespaces.iter().any(|ns| *ns == table.namespace))
            .cloned()
            .collect();

        Ok(Schema { tables })
    }

    async fn explain(&self, sql: &str) -> std::result::Result<(), ExplainError> {
        lock(&self.explained).push(sql.to_string());
        lock(&self.explain_script).pop_front().unwrap_or(Ok(()))
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        lock(&self.executed).push(sql.to_string());

        match &self.query_error {
            Some(message) => Err(InquireError::query(message.clone())),
            None => Ok(self.query_result.clone()),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
