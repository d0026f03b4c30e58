//! Generation-validation loop tests.
//!
//! Runs the public loop against scripted model and database mocks.

use std::sync::Arc;

use db_inquire::db::{ExplainError, MockDatabaseClient};
use db_inquire::few_shot::{append_example, FirstSampler};
use db_inquire::llm::{ExampleSource, MockLlmClient, PromptBuilder, QueryGenerator};
use db_inquire::query::NOT_READ_ONLY_MESSAGE;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tokio_test::{assert_err, assert_ok};

const SCHEMA: &str =
    "Table: orders\n  - id (integer)\n  - total (numeric)\n  - created_at (timestamp)";

fn generator(llm: Arc<MockLlmClient>, examples: ExampleSource) -> QueryGenerator {
    QueryGenerator::new(
        llm,
        PromptBuilder::new(examples).with_sampler(Arc::new(FirstSampler)),
    )
}

#[tokio::test]
async fn test_model_output_is_extracted_and_normalized_before_validation() {
    let raw = "Sure, here it is:\n```sql\n\
               SELECT ROUND(IFNULL(SUM(`total`), 0), 2) FROM `orders` WHERE created_at < NOW();\n\
               ```\nLet me know!";
    let llm = Arc::new(MockLlmClient::new().with_script([raw]));
    let db = MockDatabaseClient::new();

    let dir = tempdir().unwrap();
    let path = dir.path().join("examples.txt");
    let generator = generator(llm, ExampleSource::File(path));

    // A missing pool file is a configuration error.
    assert_err!(generator.generate("Revenue so far?", SCHEMA, &db, None).await);

    append_example(
        &dir.path().join("examples.txt"),
        "How many orders?",
        "SELECT COUNT(*) FROM orders;",
    )
    .unwrap();
    let query = assert_ok!(generator.generate("Revenue so far?", SCHEMA, &db, None).await);

    let expected = "SELECT ROUND(CAST(COALESCE(SUM(\"total\"), 0) AS NUMERIC), 2) \
                    FROM \"orders\" WHERE created_at < CURRENT_TIMESTAMP;";
    assert_eq!(query.as_str(), expected);
    assert_eq!(db.explained(), vec![expected]);
}

#[tokio::test]
async fn test_examples_and_schema_reach_the_prompt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("examples.txt");
    append_example(&path, "How many orders?", "SELECT COUNT(*) FROM orders;").unwrap();
    append_example(&path, "Largest order", "SELECT MAX(total) FROM orders;").unwrap();

    let llm = Arc::new(MockLlmClient::new().with_script(["SELECT 1;"]));
    let generator = generator(llm.clone(), ExampleSource::File(path));
    generator
        .generate("Smallest order", SCHEMA, &MockDatabaseClient::new(), None)
        .await
        .unwrap();

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains(&format!("### Database Schema:\n{SCHEMA}\n---\n")));
    assert!(prompt
        .contains("### Example 1:\n\n**How many orders?**\n\n**SELECT COUNT(*) FROM orders;**"));
    assert!(prompt.contains("### Example 2:\n\n**Largest order**"));
    assert!(prompt.ends_with("**User Question:** Smallest order\n\n**SQL Query:**\n"));
}

#[tokio::test]
async fn test_planner_rejection_is_fed_back_then_accepted() {
    let llm = Arc::new(MockLlmClient::new().with_script([
        "SELECT totl FROM orders;",
        "SELECT total FROM orders;",
    ]));
    let db = MockDatabaseClient::new().with_explain_results([
        Err(ExplainError::Rejected(
            "column \"totl\" does not exist".to_string(),
        )),
        Ok(()),
    ]);

    let generator = generator(llm.clone(), ExampleSource::Inline(Default::default()));
    let query = generator.generate("Totals", SCHEMA, &db, None).await.unwrap();

    assert_eq!(query.as_str(), "SELECT total FROM orders;");
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("**Failed SQL Query:** SELECT totl FROM orders;"));
    assert!(prompts[1].contains("**Database Error Message:** column \"totl\" does not exist"));
}

#[tokio::test]
async fn test_refusal_exhausts_attempts() {
    let refusal = "Error: The question cannot be answered from the available schema.";
    let llm = Arc::new(MockLlmClient::new().with_script([refusal, refusal, refusal]));
    let db = MockDatabaseClient::new();

    let generator = generator(llm.clone(), ExampleSource::Inline(Default::default()));
    let err = generator
        .generate("What is the weather?", SCHEMA, &db, None)
        .await
        .unwrap_err();

    assert!(err.is_generation_failure());
    assert_eq!(
        err.to_string(),
        format!(
            "Failed to generate a syntactically valid SQL query after 3 attempts. \
             Last database error: {NOT_READ_ONLY_MESSAGE}"
        )
    );
    assert_eq!(llm.calls(), 3);
    assert!(db.explained().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    let llm = Arc::new(MockLlmClient::new().with_script(["SELECT 1;", "SELECT 2;"]));
    let db = MockDatabaseClient::new()
        .with_explain_results([Err(ExplainError::Transport("pool timed out".to_string()))]);

    let generator = generator(llm.clone(), ExampleSource::Inline(Default::default()));
    let err = generator.generate("q", SCHEMA, &db, None).await.unwrap_err();

    assert!(!err.is_generation_failure());
    assert!(err.to_string().contains("An unexpected error occurred: pool timed out"));
    assert_eq!(llm.calls(), 1);
}
