//! Error types for db-inquire.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for db-inquire operations.
#[derive(Error, Debug)]
pub enum InquireError {
    /// Database connectivity errors (host unreachable, pool exhausted, dry-run transport, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Execution errors for a query that already passed validation.
    #[error("Query error: {0}")]
    Query(String),

    /// Text-generation service errors (unreachable, bad status, malformed body, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, malformed example pool, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation-validation loop ran out of attempts without a valid query.
    #[error(
        "Failed to generate a syntactically valid SQL query after {attempts} attempts. \
         Last database error: {last_error}"
    )]
    GenerationFailed {
        /// Total number of generation attempts made.
        attempts: usize,
        /// Message from the last failed validation.
        last_error: String,
    },

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InquireError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a retry-exhaustion error.
    pub fn generation_failed(attempts: usize, last_error: impl Into<String>) -> Self {
        Self::GenerationFailed {
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error means no valid query could be produced.
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::GenerationFailed { .. } => "Generation Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using InquireError.
pub type Result<T> = std::result::Result<T, InquireError>;
