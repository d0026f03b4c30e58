//! Natural-language analysis of query results.

use std::sync::Arc;

use tracing::debug;

use crate::db::QueryResult;
use crate::error::Result;

use super::LlmClient;

/// Returned without calling the model when the query produced no rows.
pub const EMPTY_RESULT_ANALYSIS: &str =
    "The query returned no results. There is nothing to analyze.";

const SINGLE_VALUE_INSTRUCTION: &str = "You are a senior business strategist and data analyst. \
Your task is to transform a draft data analysis into a polished and concise executive summary suitable for leadership. \
Briefly explain what this number represents in a formal, easy-to-understand sentence. \
Do not use asterisks or any other special characters. \
Keep it extremely professional and formal while displaying your findings.";

const TABLE_INSTRUCTION: &str = r#"You must present your analysis using the exact template structure that follows.
Write in a formal, professional tone using simple, easy-to-understand sentences.
Do not use any special characters like asterisks for bolding or emphasis.

Introduction
This document provides a high-level summary of the recent data analysis conducted on [briefly describe the dataset or area of focus]. The primary objective was to identify key performance indicators and derive actionable insights to inform our strategic decision-making.

Key Findings
- [Present the most important takeaway as a clear, complete sentence.]
- [Present the next significant trend or total identified from the data.]
- [Present another key observation or critical data point.]
- [Present a final crucial insight necessary for a comprehensive overview.]

Strategic Recommendations
- [State a clear, professional recommendation directly linked to the first or most significant finding.]
- [State another actionable recommendation based on the other findings to capitalize on opportunities or mitigate risks.]"#;

/// Builds the analysis prompt, or `None` for an empty result.
pub fn build_analysis_prompt(question: &str, sql: &str, result: &QueryResult) -> Option<String> {
    if result.is_empty() {
        return None;
    }

    let instruction = if result.is_single_value() {
        SINGLE_VALUE_INSTRUCTION
    } else {
        TABLE_INSTRUCTION
    };

    let mut data = result.to_markdown();
    if let Some(warning) = result.truncation_warning() {
        data.push_str(&format!("\n({warning})\n"));
    }

    Some(format!(
        "The user asked the following question:\n\"{question}\"\n\n\
         To answer this, the following SQL query was executed:\n```sql\n{sql}\n```\n\n\
         It produced this result:\n\n{data}\n\
         Your Task:\n{instruction}\n"
    ))
}

/// Asks the model to summarize query results.
pub struct ResultAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl ResultAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Summarizes `result`. Empty results get a fixed message without a model call.
    pub async fn analyze(&self, question: &str, sql: &str, result: &QueryResult) -> Result<String> {
        let Some(prompt) = build_analysis_prompt(question, sql, result) else {
            debug!("Empty result, skipping analysis");
            return Ok(EMPTY_RESULT_ANALYSIS.to_string());
        };

        let analysis = self.llm.complete(&prompt).await?;
        Ok(analysis.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Record;
    use crate::llm::MockLlmClient;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_result_skips_model() {
        let llm = Arc::new(MockLlmClient::new());
        let analyzer = ResultAnalyzer::new(llm.clone());

        let analysis = analyzer
            .analyze("q", "SELECT 1 WHERE false", &QueryResult::new())
            .await
            .unwrap();

        assert_eq!(analysis, EMPTY_RESULT_ANALYSIS);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_single_value_uses_executive_instruction() {
        let result = QueryResult::from_records(vec![record(json!({"count": 42}))]);
        let prompt =
            build_analysis_prompt("How many orders?", "SELECT COUNT(*) FROM orders;", &result)
                .unwrap();

        assert!(prompt.contains("\"How many orders?\""));
        assert!(prompt.contains("```sql\nSELECT COUNT(*) FROM orders;\n```"));
        assert!(prompt.contains("| count |\n|---|\n| 42 |\n"));
        assert!(prompt.contains("executive summary"));
        assert!(!prompt.contains("Key Findings"));
    }

    #[test]
    fn test_table_uses_structured_template() {
        let result = QueryResult::from_records(vec![
            record(json!({"category": "Snacks", "revenue": 10})),
            record(json!({"category": "Drinks", "revenue": 20})),
        ]);
        let prompt = build_analysis_prompt("Revenue by category", "SELECT ...", &result).unwrap();

        assert!(prompt.contains("Introduction"));
        assert!(prompt.contains("Key Findings"));
        assert!(prompt.contains("Strategic Recommendations"));
    }

    #[test]
    fn test_truncated_result_is_flagged() {
        let result = QueryResult::from_records(vec![
            record(json!({"n": 1, "m": 2})),
        ])
        .truncated(true);
        let prompt = build_analysis_prompt("q", "SELECT n, m FROM t", &result).unwrap();
        assert!(prompt.contains("Result truncated"));
    }

    #[tokio::test]
    async fn test_analysis_is_trimmed() {
        let llm = Arc::new(MockLlmClient::new().with_script(["  The total is 42.\n"]));
        let analyzer = ResultAnalyzer::new(llm);
        let result = QueryResult::from_records(vec![record(json!({"total": 42}))]);

        let analysis = analyzer.analyze("q", "SELECT 42", &result).await.unwrap();
        assert_eq!(analysis, "The total is 42.");
    }
}
