//! Core orchestrator for db-inquire.
//!
//! Coordinates the schema cache, the generation loop, the executor and the
//! result analyzer to answer a question end to end.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{self, DatabaseClient, QueryResult, Record, SchemaCache};
use crate::error::{InquireError, Result};
use crate::few_shot::append_example;
use crate::llm::{
    create_client, model_name, ExampleSource, LlmClient, PromptBuilder, QueryGenerator, Refinement,
    ResultAnalyzer, ValidatedQuery,
};
use crate::query::QueryExecutor;

/// The answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Natural-language summary of the result.
    pub analysis: String,
    /// The validated query that produced `data`.
    pub sql_query: String,
    /// Result rows keyed by column name.
    pub data: Vec<Record>,
    /// Column order of `data`.
    #[serde(skip)]
    pub columns: Vec<String>,
    #[serde(skip)]
    pub was_truncated: bool,
}

impl Answer {
    fn new(analysis: String, query: ValidatedQuery, result: QueryResult) -> Self {
        Self {
            analysis,
            sql_query: query.into_inner(),
            data: result.rows,
            columns: result.columns,
            was_truncated: result.was_truncated,
        }
    }

    /// Renders `data` as a markdown table.
    pub fn data_table(&self) -> String {
        QueryResult {
            columns: self.columns.clone(),
            rows: self.data.clone(),
            ..QueryResult::default()
        }
        .to_markdown()
    }
}

/// Answers natural-language questions about one database.
pub struct Inquirer {
    db: Arc<dyn DatabaseClient>,
    generator: QueryGenerator,
    analyzer: ResultAnalyzer,
    schema_cache: SchemaCache,
    namespaces: Vec<String>,
    schema_doc_path: Option<PathBuf>,
}

impl Inquirer {
    /// Connects to the configured database and text-generation service.
    pub async fn connect(config: &Config) -> Result<Self> {
        info!(database = %config.database.display_string(), "Connecting");
        let db = db::connect(&config.database).await?;
        let llm = create_client(&config.llm)?;
        info!(
            provider = %config.llm.provider,
            model = %model_name(&config.llm),
            "Text-generation client ready"
        );
        Ok(Self::new(config, db, llm))
    }

    /// Creates an inquirer from already constructed clients.
    pub fn new(config: &Config, db: Arc<dyn DatabaseClient>, llm: Arc<dyn LlmClient>) -> Self {
        let generation = &config.generation;
        let prompts = PromptBuilder::new(ExampleSource::File(generation.examples_path.clone()))
            .with_num_examples(generation.num_examples)
            .with_business_context(generation.business_context.clone());

        Self::with_prompts(config, db, llm, prompts)
    }

    /// Creates an inquirer with a custom prompt builder.
    pub fn with_prompts(
        config: &Config,
        db: Arc<dyn DatabaseClient>,
        llm: Arc<dyn LlmClient>,
        prompts: PromptBuilder,
    ) -> Self {
        let generation = &config.generation;
        let generator = QueryGenerator::new(Arc::clone(&llm), prompts)
            .with_max_syntax_retries(generation.max_syntax_retries);

        Self {
            db,
            generator,
            analyzer: ResultAnalyzer::new(llm),
            schema_cache: SchemaCache::new(generation.schema_ttl()),
            namespaces: config.database.namespaces.clone(),
            schema_doc_path: generation.schema_doc_path.clone(),
        }
    }

    /// Returns the schema description shown to the model.
    ///
    /// A configured schema document takes precedence over live introspection.
    pub async fn schema(&self) -> Result<Arc<str>> {
        if let Some(path) = &self.schema_doc_path {
            debug!(path = %path.display(), "Reading schema document");
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                InquireError::config(format!(
                    "Failed to read schema document {}: {e}",
                    path.display()
                ))
            })?;
            return Ok(Arc::from(text.trim()));
        }

        self.schema_cache.get(self.db.as_ref(), &self.namespaces).await
    }

    /// Generates a validated query without executing it.
    pub async fn generate_sql(
        &self,
        question: &str,
        refinement: Option<&Refinement>,
    ) -> Result<ValidatedQuery> {
        let schema = self.schema().await?;
        self.generator
            .generate(question, &schema, self.db.as_ref(), refinement)
            .await
    }

    /// Generates, executes and summarizes a query for `question`.
    pub async fn ask(&self, question: &str, refinement: Option<&Refinement>) -> Result<Answer> {
        let query = self.generate_sql(question, refinement).await?;
        let result = QueryExecutor::new(self.db.as_ref()).execute(&query).await?;
        let analysis = self
            .analyzer
            .analyze(question, query.as_str(), &result)
            .await?;

        Ok(Answer::new(analysis, query, result))
    }

    /// Closes the database pool.
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }
}

/// Records a question/query pair the user confirmed as correct.
///
/// Only touches the configured example pool, so no connection is needed.
pub fn save_feedback(config: &Config, question: &str, sql: &str) -> Result<()> {
    let path = &config.generation.examples_path;
    append_example(path, question, sql)?;
    info!(path = %path.display(), "Saved example to pool");
    Ok(())
}
