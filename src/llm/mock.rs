//! Mock LLM client for testing.
//!
//! Provides deterministic responses, either scripted in order or chosen by
//! matching patterns against the question embedded in the prompt.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{InquireError, Result};
use crate::llm::prompt::QUESTION_MARKER;
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses.
///
/// Scripted responses are consumed first, one per call. Once the script is
/// empty the client falls back to pattern matching.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    script: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Queues responses returned by successive calls, in order.
    pub fn with_script<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.script).extend(responses.into_iter().map(|r| Ok(r.into())));
        self
    }

    /// Queues a failing call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(InquireError::llm(message)));
        self
    }

    /// Number of completion calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Returns the question part of a generation prompt, or the whole prompt.
    fn question_of(prompt: &str) -> &str {
        prompt
            .rsplit_once(QUESTION_MARKER)
            .map(|(_, question)| question)
            .unwrap_or(prompt)
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("all users") || input_lower.contains("show users") {
            return "```sql\nSELECT * FROM users;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("users") {
            return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
        }

        if input_lower.contains("revenue") && input_lower.contains("category") {
            return "SELECT c.`category`, ROUND(SUM(o.sales_revenue), 2) AS revenue\n\
                    FROM ssa_order_data o\n\
                    JOIN ssa_category_data c ON o.sku = c.variant_sku\n\
                    GROUP BY c.`category`;"
                .to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());

        if let Some(scripted) = lock(&self.script).pop_front() {
            return scripted;
        }

        Ok(self.mock_response(Self::question_of(prompt)))
    }
}
