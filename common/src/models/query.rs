//! Tabular query result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Materialized result of one query execution.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Column information, in select-list order.
    pub columns: Vec<ColumnInfo>,

    /// Row data (each row is a vector of JSON values, SQL NULL as `null`).
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows returned.
    #[serde(default)]
    pub row_count: usize,

    /// Query execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: u64,

    /// When the store executed the query.
    pub fetched_at: DateTime<Utc>,
}

/// Column information in query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Store type name (e.g. "INT8", "NUMERIC", "TEXT").
    pub data_type: String,

    /// Whether the column is nullable, when the store reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
        }
    }
}

impl QueryResult {
    /// Builds a result, deriving `row_count` from the rows.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time_ms: 0,
            fetched_at: Utc::now(),
        }
    }

    /// Creates a new empty query result.
    pub fn empty() -> Self {
        Self::new(vec![], vec![])
    }

    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Iterates over the values of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &serde_json::Value> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&serde_json::Value::Null))
    }
}
