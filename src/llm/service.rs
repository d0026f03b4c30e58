//! The generation-validation loop.
//!
//! Turns a question into a query the database planner has accepted:
//! prompt, complete, extract, normalize, validate, and on a planner
//! rejection feed the failed SQL and the database message back into a
//! correction prompt until the retry budget runs out.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::db::DatabaseClient;
use crate::dialect::DialectNormalizer;
use crate::error::{InquireError, Result};
use crate::query::validator::{validate, Validation};

use super::parser::extract_sql;
use super::prompt::{effective_instruction, syntax_fix_instruction, PromptBuilder, Refinement};
use super::LlmClient;

/// Default number of correction attempts after the first generation.
pub const DEFAULT_MAX_SYNTAX_RETRIES: usize = 2;

/// SQL that passed validation in the invocation that produced it.
///
/// Only the generation loop can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery(String);

impl ValidatedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidatedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates validated SQL from natural-language questions.
pub struct QueryGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    normalizer: DialectNormalizer,
    max_syntax_retries: usize,
}

impl QueryGenerator {
    /// Creates a generator with the PostgreSQL normalizer and the default retry budget.
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptBuilder) -> Self {
        Self {
            llm,
            prompts,
            normalizer: DialectNormalizer::postgres(),
            max_syntax_retries: DEFAULT_MAX_SYNTAX_RETRIES,
        }
    }

    pub fn with_max_syntax_retries(mut self, max_syntax_retries: usize) -> Self {
        self.max_syntax_retries = max_syntax_retries;
        self
    }

    pub fn with_normalizer(mut self, normalizer: DialectNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Total generation calls one invocation may make.
    pub fn max_attempts(&self) -> usize {
        self.max_syntax_retries + 1
    }

    /// Runs the loop for `question` against `schema`.
    ///
    /// Returns the first candidate the validator accepts. Fails immediately
    /// on a generation-service error or a dry-run transport failure, and with
    /// [`InquireError::GenerationFailed`] once every attempt was rejected.
    pub async fn generate(
        &self,
        question: &str,
        schema: &str,
        db: &dyn DatabaseClient,
        refinement: Option<&Refinement>,
    ) -> Result<ValidatedQuery> {
        let start = Instant::now();
        let instruction = effective_instruction(question, refinement);
        if refinement.is_some() {
            info!("Regenerating query with user feedback");
        }

        let attempts = self.max_attempts();
        let mut failed_sql = String::new();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let task = if attempt == 1 {
                instruction.clone()
            } else {
                syntax_fix_instruction(&instruction, &failed_sql, &last_error)
            };
            let prompt = self.prompts.build(schema, &task)?;

            let raw = self.llm.complete(&prompt).await?;
            let candidate = self.normalizer.normalize(&extract_sql(&raw));
            debug!(
                attempt,
                raw_len = raw.len(),
                candidate_len = candidate.len(),
                "Candidate generated"
            );

            match validate(&candidate, db).await {
                Validation::Valid => {
                    info!(
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "SQL query validated"
                    );
                    return Ok(ValidatedQuery(candidate));
                }
                rejected @ (Validation::NotReadOnly(_) | Validation::SyntaxRejected(_)) => {
                    warn!(attempt, attempts, error = %rejected, "Candidate rejected");
                    last_error = rejected.message().to_string();
                    failed_sql = candidate;
                }
                Validation::TransportFailure(msg) => {
                    warn!(attempt, error = %msg, "Dry run could not be performed");
                    return Err(InquireError::connection(msg));
                }
            }
        }

        Err(InquireError::generation_failed(attempts, last_error))
    }
}
