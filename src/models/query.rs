//! Query-related data models.
//!
//! This module defines types for SQL query requests and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A positional parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for QueryParam {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// SQL text plus positional parameters (`?` for MySQL, `$1, $2, ...` for PostgreSQL).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

impl QueryRequest {
    /// Create a new query request without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to this query.
    pub fn with_param(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Replace all parameters.
    pub fn with_params(mut self, params: Vec<QueryParam>) -> Self {
        self.params = params;
        self
    }
}

/// Result set of one statement.
///
/// Every row holds exactly `columns.len()` cells, positionally aligned with
/// `columns`. Cells are strings, numbers, booleans or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&JsonValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_param_deserialize_untagged() {
        let params: Vec<QueryParam> =
            serde_json::from_value(json!([null, true, 7, 1.5, "x"])).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(7),
                QueryParam::Float(1.5),
                QueryParam::String("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_request_builder() {
        let req = QueryRequest::new("SELECT * FROM users WHERE id = ? AND active = ?")
            .with_param(1)
            .with_param(true);
        assert_eq!(req.params.len(), 2);
        assert_eq!(req.params[0], QueryParam::Int(1));
    }

    #[test]
    fn test_query_result_cell_lookup() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![json!(1), JsonValue::Null]],
        };
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.cell(0, "id"), Some(&json!(1)));
        assert_eq!(result.cell(0, "name"), Some(&JsonValue::Null));
        assert_eq!(result.cell(0, "missing"), None);
        assert_eq!(result.cell(1, "id"), None);
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::default();
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
    }
}
