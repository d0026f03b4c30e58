//! db-inquire - Ask questions of a PostgreSQL database in plain language.
//!
//! Generates SQL with a text-generation model, normalizes it to PostgreSQL,
//! validates it against the live database and summarizes the results.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod few_shot;
pub mod llm;
pub mod logging;
pub mod query;
