//! Query execution tool.
//!
//! This module implements the `execute` MCP tool. Statements are passed to
//! the session's adapter unmodified; no read/write filtering is applied.

use crate::db::{DatabaseAdapter, SessionRegistry};
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, QueryRequest, QueryResult};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the execute tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteInput {
    /// Session ID returned by connect
    pub session_id: String,
    /// SQL statement to execute
    pub sql: String,
    /// Positional parameters (use ? for MySQL, $1,$2... for PostgreSQL)
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

/// Handler for the execute tool.
pub struct QueryToolHandler {
    registry: Arc<SessionRegistry>,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Handle the execute tool call.
    pub async fn execute(&self, input: ExecuteInput) -> DbResult<QueryResult> {
        let sql = require_sql(&input.sql)?;
        let request = QueryRequest::new(sql).with_params(input.params);
        self.run(&input.session_id, &request).await
    }

    /// Run a request against a live session.
    pub(crate) async fn run(&self, session_id: &str, request: &QueryRequest) -> DbResult<QueryResult> {
        let start = Instant::now();
        let adapter = self.registry.require(session_id).await?;
        let result = adapter.lock().await.execute(request).await?;

        info!(
            session_id = %session_id,
            row_count = result.row_count(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(result)
    }
}

/// Trim the statement and reject empty input.
pub(crate) fn require_sql(sql: &str) -> DbResult<&str> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(DbError::validation("SQL statement is required"));
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_input_defaults() {
        let input: ExecuteInput =
            serde_json::from_str(r#"{"session_id": "sess_1", "sql": "SELECT 1"}"#).unwrap();
        assert_eq!(input.sql, "SELECT 1");
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_execute_input_with_params() {
        let input: ExecuteInput = serde_json::from_str(
            r#"{"session_id": "sess_1", "sql": "SELECT ?, ?, ?", "params": [1, "a", null]}"#,
        )
        .unwrap();
        assert_eq!(
            input.params,
            vec![
                QueryParam::Int(1),
                QueryParam::String("a".to_string()),
                QueryParam::Null
            ]
        );
    }

    #[test]
    fn test_require_sql() {
        assert_eq!(require_sql("  SELECT 1\n").unwrap(), "SELECT 1");
        assert!(matches!(
            require_sql("   "),
            Err(DbError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_sql_before_lookup() {
        let handler = QueryToolHandler::new(Arc::new(SessionRegistry::new()));
        let err = handler
            .execute(ExecuteInput {
                session_id: "sess_missing".to_string(),
                sql: "".to_string(),
                params: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_execute_unknown_session() {
        let handler = QueryToolHandler::new(Arc::new(SessionRegistry::new()));
        let err = handler
            .execute(ExecuteInput {
                session_id: "sess_missing".to_string(),
                sql: "SELECT 1".to_string(),
                params: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SessionNotFound { .. }));
    }
}
