//! Integration tests for db-inquire.

pub mod generation_test;
pub mod inquirer_test;
pub mod postgres_test;
