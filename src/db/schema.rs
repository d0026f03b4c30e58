//! Database schema types for db-inquire.
//!
//! Represents the tables and columns the model is allowed to query.

use serde::{Deserialize, Serialize};

/// Namespace whose tables are listed without a qualifier.
const DEFAULT_NAMESPACE: &str = "public";

/// Represents the introspected schema of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// All tables across the introspected namespaces.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema as a description for an LLM prompt.
    ///
    /// ```text
    /// Table: orders
    ///   - id (integer)
    ///   - total (numeric)
    /// ```
    ///
    /// Tables are separated by a blank line. Tables outside `public` are
    /// qualified with their namespace.
    pub fn format_for_llm(&self) -> String {
        self.tables
            .iter()
            .map(Table::format_for_llm)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Namespace (PostgreSQL schema) the table lives in.
    pub namespace: String,

    /// Table name.
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table in the `public` namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Moves the table into another namespace.
    pub fn in_namespace(self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..self
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// Returns the name as it should appear in SQL.
    pub fn qualified_name(&self) -> String {
        if self.namespace == DEFAULT_NAMESPACE || self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    fn format_for_llm(&self) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(|column| format!("  - {} ({})\n", column.name, column.data_type))
            .collect::<String>();

        format!("Table: {}\n{}", self.qualified_name(), column_lines)
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "integer", "character varying").
    pub data_type: String,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}
