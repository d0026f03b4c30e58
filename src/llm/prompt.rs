//! Prompt construction for SQL generation.
//!
//! Builds a few-shot prompt from fixed instructions, optional business
//! context, the schema description, sampled example pairs and the task.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::few_shot::{ExamplePair, ExamplePool, ExampleSampler, RandomSampler};

/// Marker that introduces the task in every generation prompt.
pub const QUESTION_MARKER: &str = "**User Question:**";

/// Default number of examples sampled into a prompt.
pub const DEFAULT_NUM_EXAMPLES: usize = 3;

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert PostgreSQL data analyst and query optimization specialist. Your sole purpose is to convert a business question into a single, high-performance, and syntactically correct PostgreSQL query based on the provided schema and rules.

---
### ## Core Directives
1.  **Output Format:** You MUST respond ONLY with the raw SQL query. Do NOT include markdown code blocks (like ```sql), explanations, or any other text.
2.  **Schema Adherence:** You MUST use ONLY the tables and columns provided in the schema below. Verify that every column you use exists in the specified table. Do not invent or assume any others.
3.  **Error Handling:** If the question cannot be answered with the provided schema, you MUST reply with the exact text: "Error: The question cannot be answered with the available schema."
4.  **Dialect Compliance:** The query MUST be 100% compliant with the PostgreSQL dialect.

---
### ## SQL Logic & Structure Rules
1.  **GROUP BY Rule:** When a `SELECT` statement includes an aggregate function (e.g., `SUM`, `COUNT`) alongside a regular column, that regular column MUST be in the `GROUP BY` clause.
    * **INCORRECT:** `SELECT department, SUM(sales) FROM orders;`
    * **CORRECT:** `SELECT department, SUM(sales) FROM orders GROUP BY department;`

2.  **Filtering Aggregates (`HAVING` Clause):** To filter on the result of an aggregate function (`COUNT()`, `SUM()`, etc.), you MUST use the `HAVING` clause after the `GROUP BY`. You MUST NOT use aggregate functions in the `WHERE` clause.

3.  **Filtering Window Functions (`ROW_NUMBER`)**: To filter on the result of a window function (`ROW_NUMBER()`, `RANK()`, etc.), you MUST first compute it in a Common Table Expression (CTE) or a subquery, and then apply the filter to the result in the outer query.

4.  **Filtering Rows (`WHERE` Clause):** The `WHERE` clause must perfectly match the conditions and timeframes from the user's question. Do not add any "hallucinated" filters that were not requested.

5.  **Cumulative Totals:** Do not calculate a cumulative total (e.g., a running sum) unless the user explicitly asks for it.

6.  **Table Aliases:** Use short, non-reserved words for aliases. Ensure every column in the `GROUP BY` and `ORDER BY` clauses belongs to the correct table alias (e.g., `o.customer_id`)."#;

/// A prior answer the user rejected, with their reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub previous_sql: String,
    pub feedback: String,
}

impl Refinement {
    /// Returns a refinement only when both parts are present and non-blank.
    ///
    /// Both parts are kept exactly as given.
    pub fn from_parts(previous_sql: Option<&str>, feedback: Option<&str>) -> Option<Self> {
        let previous_sql = previous_sql.filter(|s| !s.trim().is_empty())?;
        let feedback = feedback.filter(|s| !s.trim().is_empty())?;
        Some(Self {
            previous_sql: previous_sql.to_string(),
            feedback: feedback.to_string(),
        })
    }
}

/// Where the example pool comes from.
#[derive(Debug, Clone)]
pub enum ExampleSource {
    /// Read and parsed on every prompt build.
    File(PathBuf),
    /// An already parsed pool.
    Inline(ExamplePool),
}

impl ExampleSource {
    fn load(&self) -> Result<ExamplePool> {
        match self {
            Self::File(path) => ExamplePool::load(path),
            Self::Inline(pool) => Ok(pool.clone()),
        }
    }
}

/// Assembles generation prompts.
#[derive(Clone)]
pub struct PromptBuilder {
    examples: ExampleSource,
    num_examples: usize,
    sampler: Arc<dyn ExampleSampler>,
    business_context: Option<String>,
}

impl PromptBuilder {
    /// Creates a builder with random sampling and the default example count.
    pub fn new(examples: ExampleSource) -> Self {
        Self {
            examples,
            num_examples: DEFAULT_NUM_EXAMPLES,
            sampler: Arc::new(RandomSampler::new()),
            business_context: None,
        }
    }

    pub fn with_num_examples(mut self, num_examples: usize) -> Self {
        self.num_examples = num_examples;
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn ExampleSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Sets free text shown to the model before the schema. Blank text is ignored.
    pub fn with_business_context(mut self, context: Option<String>) -> Self {
        self.business_context = context.filter(|c| !c.trim().is_empty());
        self
    }

    /// Builds a prompt for `instruction` against `schema`.
    pub fn build(&self, schema: &str, instruction: &str) -> Result<String> {
        let pool = self.examples.load()?;
        let selected = pool.select(self.num_examples, self.sampler.as_ref());

        let mut prompt = String::from(SYSTEM_INSTRUCTIONS);
        prompt.push_str("\n\n---\n");

        if let Some(context) = &self.business_context {
            prompt.push_str("### ## Business Context\n\n");
            prompt.push_str(context.trim());
            prompt.push_str("\n\n");
        }

        prompt.push_str("### Database Schema:\n");
        prompt.push_str(schema);
        prompt.push_str("\n---\n");
        prompt.push_str(&format_examples(&selected));
        prompt.push_str("---\n\n### New Task:\n");
        prompt.push_str(&format!("{QUESTION_MARKER} {instruction}\n\n**SQL Query:**\n"));

        Ok(prompt)
    }
}

/// Formats examples as numbered markdown blocks.
pub fn format_examples(examples: &[ExamplePair]) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| {
            format!(
                "### Example {}:\n\n**{}**\n\n**{}**\n\n",
                i + 1,
                example.question,
                example.query
            )
        })
        .collect()
}

/// Returns the first-pass instruction: the question, or a refinement request.
pub fn effective_instruction(question: &str, refinement: Option<&Refinement>) -> String {
    match refinement {
        None => question.to_string(),
        Some(refinement) => format!(
            "The user was not satisfied with the result from the previous query.\n\
             Analyze the user's original question, the previous query, and the user's feedback.\n\
             Create a new, corrected PostgreSQL query. Return ONLY the final SQL.\n\n\
             **User's Original Question:** {question}\n\
             **Previous Incorrect SQL Query:** {}\n\n\
             **User's Feedback on Why It Was Wrong:**\n{}",
            refinement.previous_sql, refinement.feedback
        ),
    }
}

/// Appends a syntax-correction request to `instruction`.
pub fn syntax_fix_instruction(instruction: &str, failed_sql: &str, error: &str) -> String {
    format!(
        "{instruction}\n\n\
         The previously generated SQL query failed with a syntax error.\n\
         Analyze the schema, examples, user question, failed SQL, and the database error message.\n\
         Output ONLY the corrected, valid PostgreSQL query.\n\n\
         **Failed SQL Query:** {failed_sql}\n\
         **Database Error Message:** {error}"
    )
}
