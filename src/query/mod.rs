//! Validation and execution of generated SQL.
//!
//! The validator decides whether a candidate may be handed out; the executor
//! runs candidates that were handed out.

pub mod executor;
pub mod validator;

pub use executor::QueryExecutor;
pub use validator::{is_read_only, validate, Validation, NOT_READ_ONLY_MESSAGE};
