//! End-to-end tests for the `Inquirer` facade using mocks.

use std::sync::Arc;

use db_inquire::app::{save_feedback, Inquirer};
use db_inquire::config::Config;
use db_inquire::db::{MockDatabaseClient, QueryResult, Record, Schema, Table};
use db_inquire::few_shot::{append_example, ExamplePool};
use db_inquire::llm::{MockLlmClient, Refinement, EMPTY_RESULT_ANALYSIS};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tokio_test::assert_ok;

fn shop_schema() -> Schema {
    Schema {
        tables: vec![
            Table::new("orders")
                .with_column("id", "integer")
                .with_column("total", "numeric"),
            Table::new("users").with_column("id", "integer"),
            Table::new("audit_log")
                .in_namespace("internal")
                .with_column("id", "integer"),
        ],
    }
}

/// Config with a one-example pool in a temporary directory.
fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.generation.examples_path = dir.path().join("examples.txt");
    config.generation.num_examples = 1;
    append_example(
        &config.generation.examples_path,
        "List all users",
        "SELECT * FROM users;",
    )
    .unwrap();
    config
}

fn count_result(n: i64) -> QueryResult {
    let mut row = Record::new();
    row.insert("count".to_string(), json!(n));
    QueryResult::from_records(vec![row])
}

#[tokio::test]
async fn test_ask_with_default_mock_patterns() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let db = Arc::new(
        MockDatabaseClient::with_schema(shop_schema()).with_query_result(count_result(7)),
    );
    let llm = Arc::new(MockLlmClient::new());

    let inquirer = Inquirer::new(&config, db.clone(), llm.clone());
    let answer = assert_ok!(inquirer.ask("Count the orders", None).await);

    assert_eq!(answer.sql_query, "SELECT COUNT(*) FROM orders;");
    assert_eq!(answer.data, count_result(7).rows);
    assert_eq!(db.executed(), vec!["SELECT COUNT(*) FROM orders;"]);

    // Only the default namespace is described.
    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("Table: orders"));
    assert!(!prompt.contains("audit_log"));
    assert!(prompt.contains("**List all users**"));
}

#[tokio::test]
async fn test_empty_result_skips_analysis_call() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let db = Arc::new(
        MockDatabaseClient::with_schema(shop_schema()).with_query_result(QueryResult::new()),
    );
    let llm = Arc::new(MockLlmClient::new());

    let inquirer = Inquirer::new(&config, db, llm.clone());
    let answer = inquirer.ask("Show all users", None).await.unwrap();

    assert_eq!(answer.analysis, EMPTY_RESULT_ANALYSIS);
    assert!(answer.data.is_empty());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_refinement_reaches_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let db = Arc::new(MockDatabaseClient::with_schema(shop_schema()));
    let llm = Arc::new(MockLlmClient::new().with_script(["SELECT COUNT(*) FROM users;"]));

    let inquirer = Inquirer::new(&config, db, llm.clone());
    let refinement = Refinement::from_parts(
        Some("SELECT COUNT(*) FROM orders;"),
        Some("I asked about users, not orders"),
    );
    let query = inquirer
        .generate_sql("How many users signed up?", refinement.as_ref())
        .await
        .unwrap();

    assert_eq!(query.as_str(), "SELECT COUNT(*) FROM users;");
    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("**User's Original Question:** How many users signed up?"));
    assert!(prompt.contains("**Previous Incorrect SQL Query:** SELECT COUNT(*) FROM orders;"));
    assert!(prompt.contains("I asked about users, not orders"));
}

#[tokio::test]
async fn test_introspection_failure_surfaces() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let db = Arc::new(MockDatabaseClient::new().with_introspect_error("connection refused"));
    let llm = Arc::new(MockLlmClient::new());

    let inquirer = Inquirer::new(&config, db, llm.clone());
    let err = inquirer.ask("Count the orders", None).await.unwrap_err();

    assert!(err.to_string().contains("connection refused"));
    assert_eq!(llm.calls(), 0);
}

#[test]
fn test_feedback_grows_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    save_feedback(&config, "Count the orders", "SELECT COUNT(*) FROM orders;").unwrap();
    assert!(save_feedback(&config, "  ", "SELECT 1;").is_err());

    let pool = ExamplePool::load(&config.generation.examples_path).unwrap();
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.examples()[1].question, "Count the orders");
}
