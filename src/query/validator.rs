//! Dry-run validation of candidate SQL.
//!
//! A candidate must start with `SELECT` or `WITH` and be accepted by the
//! database planner through `EXPLAIN`. Nothing is executed.

use std::fmt;

use tracing::debug;

use crate::db::{DatabaseClient, ExplainError};

/// Message returned for statements that are not read-only.
pub const NOT_READ_ONLY_MESSAGE: &str =
    "Validation failed: Only SELECT or CTE statements can be checked.";

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Read-only and accepted by the planner.
    Valid,
    /// Rejected by the read-only gate before reaching the database.
    NotReadOnly(String),
    /// Rejected by the planner. Carries the database's own message.
    SyntaxRejected(String),
    /// The dry run could not be performed at all.
    TransportFailure(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Whether another generation attempt could fix this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReadOnly(_) | Self::SyntaxRejected(_))
    }

    /// Returns the message carried into a correction prompt.
    pub fn message(&self) -> &str {
        match self {
            Self::Valid => "OK",
            Self::NotReadOnly(msg) | Self::SyntaxRejected(msg) | Self::TransportFailure(msg) => msg,
        }
    }

    /// Boolean/message view of the outcome.
    pub fn as_pair(&self) -> (bool, &str) {
        (self.is_valid(), self.message())
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Returns true if `sql` starts with `SELECT` or `WITH`, ignoring case and
/// surrounding whitespace.
pub fn is_read_only(sql: &str) -> bool {
    let upper = sql.trim().to_uppercase();
    upper.starts_with("SELECT") || upper.starts_with("WITH")
}

/// Validates `sql` against `db` without executing it.
///
/// The dry run is bounded by the client's explain timeout.
pub async fn validate(sql: &str, db: &dyn DatabaseClient) -> Validation {
    if !is_read_only(sql) {
        debug!("Candidate rejected by read-only gate");
        return Validation::NotReadOnly(NOT_READ_ONLY_MESSAGE.to_string());
    }

    match db.explain(sql).await {
        Ok(()) => Validation::Valid,
        Err(ExplainError::Rejected(msg)) => Validation::SyntaxRejected(msg),
        Err(ExplainError::Transport(msg)) => {
            Validation::TransportFailure(format!("An unexpected error occurred: {msg}"))
        }
    }
}
