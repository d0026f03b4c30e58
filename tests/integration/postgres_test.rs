//! End-to-end tests against a live PostgreSQL database.
//!
//! The model is scripted; validation and execution hit the real server.

use std::sync::Arc;

use db_inquire::app::Inquirer;
use db_inquire::config::{Config, DatabaseConfig};
use db_inquire::db::{DatabaseClient, PostgresClient};
use db_inquire::error::InquireError;
use db_inquire::few_shot::append_example;
use db_inquire::llm::MockLlmClient;
use db_inquire::query::{validate, Validation};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

async fn get_test_client(config: &DatabaseConfig) -> Option<Arc<PostgresClient>> {
    PostgresClient::connect(config).await.ok().map(Arc::new)
}

#[tokio::test]
async fn test_ask_against_live_database() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database = DatabaseConfig::from_url(&url).unwrap();
    config.generation.examples_path = dir.path().join("examples.txt");
    append_example(&config.generation.examples_path, "One", "SELECT 1;").unwrap();

    let Some(db) = get_test_client(&config.database).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let llm = Arc::new(MockLlmClient::new().with_script([
        "SELECT * FROM definitely_missing_table;",
        "```sql\nSELECT 40 + 2 AS answer, 'forty-two' AS label;\n```",
        "The answer is 42.",
    ]));
    let inquirer = Inquirer::new(&config, db.clone(), llm.clone());

    let answer = inquirer.ask("What is the answer?", None).await.unwrap();

    assert_eq!(answer.sql_query, "SELECT 40 + 2 AS answer, 'forty-two' AS label;");
    assert_eq!(answer.columns, vec!["answer", "label"]);
    assert_eq!(
        serde_json::to_value(&answer.data).unwrap(),
        json!([{"answer": 42, "label": "forty-two"}])
    );
    assert_eq!(answer.analysis, "The answer is 42.");

    let retry_prompt = &llm.prompts()[1];
    assert!(retry_prompt.contains("definitely_missing_table"));
    assert!(retry_prompt.contains("does not exist"));

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_data_modifying_statements_never_run() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let config = DatabaseConfig::from_url(&url).unwrap();
    let Some(db) = get_test_client(&config).await else {
        eprintln!("Skipping test: database unreachable");
        return;
    };

    let outcome = validate("CREATE TABLE inquire_should_not_exist (id int)", db.as_ref()).await;
    assert!(matches!(outcome, Validation::NotReadOnly(_)));

    // Writes hidden in a CTE are refused by the server.
    let err = db
        .execute_query(
            "WITH d AS (DELETE FROM pg_catalog.pg_description WHERE false RETURNING 1) \
             SELECT * FROM d",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InquireError::Query(_)), "unexpected error: {err}");

    let result = db
        .execute_query("SELECT current_setting('transaction_read_only') AS ro")
        .await
        .unwrap();
    assert_eq!(result.rows[0]["ro"], json!("on"));

    db.close().await.unwrap();
}
