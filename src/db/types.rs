//! Query result types for db-inquire.
//!
//! Rows are carried as JSON records keyed by column name, which is also the
//! shape handed to callers and embedded in analysis prompts.

use std::time::Duration;

/// A single result row: column name to JSON value, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Represents the result of executing a SQL query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,

    /// Rows of data.
    pub rows: Vec<Record>,

    /// Time taken to execute the query.
    pub execution_time: Duration,

    /// Number of rows in the result (may be truncated).
    pub row_count: usize,

    /// Whether more rows were available than were fetched.
    pub was_truncated: bool,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result from records, taking column order from the first row.
    pub fn from_records(rows: Vec<Record>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
            was_truncated: false,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Marks the result as truncated.
    pub fn truncated(mut self, was_truncated: bool) -> Self {
        self.was_truncated = was_truncated;
        self
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true for a one-row, one-column result.
    pub fn is_single_value(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1
    }

    /// Returns a truncation warning message if the result was truncated.
    pub fn truncation_warning(&self) -> Option<String> {
        self.was_truncated
            .then(|| format!("Result truncated: showing the first {} rows", self.row_count))
    }

    /// Renders the result as a markdown table.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut out = format!("| {} |\n", self.columns.join(" | "));
        out.push_str(&format!(
            "|{}|\n",
            self.columns.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        ));

        for row in &self.rows {
            let cells = self
                .columns
                .iter()
                .map(|column| row.get(column).map(display_value).unwrap_or_default())
                .collect::<Vec<_>>();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }

        out
    }
}

/// Formats a JSON value for display in a table cell.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_query_result_new() {
        let result = QueryResult::new();
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
        assert_eq!(result.to_markdown(), "");
    }

    #[test]
    fn test_from_records_keeps_column_order() {
        let result = QueryResult::from_records(vec![
            record(json!({"name": "Alice", "age": 30})),
            record(json!({"name": "Bob", "age": null})),
        ]);

        assert_eq!(result.columns, vec!["name", "age"]);
        assert_eq!(result.row_count, 2);
        assert!(!result.is_single_value());
    }

    #[test]
    fn test_to_markdown() {
        let result = QueryResult::from_records(vec![
            record(json!({"category": "Snacks", "revenue": 120.5})),
            record(json!({"category": "Drinks", "revenue": null})),
        ]);

        assert_eq!(
            result.to_markdown(),
            "| category | revenue |\n|---|---|\n| Snacks | 120.5 |\n| Drinks | NULL |\n"
        );
    }

    #[test]
    fn test_single_value() {
        let result = QueryResult::from_records(vec![record(json!({"count": 42}))]);
        assert!(result.is_single_value());
    }

    #[test]
    fn test_truncation_warning() {
        let result = QueryResult::from_records(vec![record(json!({"n": 1}))]);
        assert!(result.truncation_warning().is_none());

        let truncated = result.truncated(true);
        assert_eq!(
            truncated.truncation_warning(),
            Some("Result truncated: showing the first 1 rows".to_string())
        );
    }

    #[test]
    fn test_with_execution_time() {
        let result = QueryResult::new().with_execution_time(Duration::from_millis(100));
        assert_eq!(result.execution_time, Duration::from_millis(100));
    }
}
