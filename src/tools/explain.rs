//! Query execution plan tool.
//!
//! This module implements the `explain` MCP tool. MySQL and PostgreSQL share
//! the `EXPLAIN [ANALYZE] <sql>` form, so the statement is rewritten and run
//! through the same path as `execute`.

use crate::db::SessionRegistry;
use crate::error::DbResult;
use crate::models::{QueryParam, QueryRequest, QueryResult};
use crate::tools::query::{QueryToolHandler, require_sql};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for the explain tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExplainInput {
    /// Session ID returned by connect
    pub session_id: String,
    /// SQL statement to explain
    pub sql: String,
    /// Positional parameters for parameterized statements
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Run EXPLAIN ANALYZE. The statement is actually executed, including writes.
    #[serde(default)]
    pub analyze: bool,
}

/// Output from the explain tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExplainOutput {
    /// Plan rows as returned by the engine
    #[serde(flatten)]
    pub result: QueryResult,
    /// The SQL statement that was explained
    pub query: String,
    pub analyze: bool,
}

/// Handler for the explain tool.
pub struct ExplainToolHandler {
    query: QueryToolHandler,
}

impl ExplainToolHandler {
    /// Create a new explain tool handler.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            query: QueryToolHandler::new(registry),
        }
    }

    /// Handle the explain tool call.
    pub async fn explain(&self, input: ExplainInput) -> DbResult<ExplainOutput> {
        let sql = require_sql(&input.sql)?;
        let request = QueryRequest::new(explain_sql(sql, input.analyze)).with_params(input.params);
        let result = self.query.run(&input.session_id, &request).await?;

        Ok(ExplainOutput {
            result,
            query: sql.to_string(),
            analyze: input.analyze,
        })
    }
}

/// Build the EXPLAIN statement for `sql`.
pub fn explain_sql(sql: &str, analyze: bool) -> String {
    if analyze {
        format!("EXPLAIN ANALYZE {}", sql)
    } else {
        format!("EXPLAIN {}", sql)
    }
}
