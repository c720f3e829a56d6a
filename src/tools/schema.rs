//! Schema introspection tool.
//!
//! This module implements the `introspect` MCP tool.

use crate::db::{DatabaseAdapter, SessionRegistry};
use crate::error::DbResult;
use crate::models::DatabaseLayout;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the introspect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IntrospectInput {
    /// Session ID returned by connect
    pub session_id: String,
}

/// Handler for the introspect tool.
pub struct SchemaToolHandler {
    registry: Arc<SessionRegistry>,
}

impl SchemaToolHandler {
    /// Create a new schema tool handler.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Handle the introspect tool call.
    pub async fn introspect(&self, input: IntrospectInput) -> DbResult<DatabaseLayout> {
        let start = Instant::now();
        let adapter = self.registry.require(&input.session_id).await?;
        let layout = adapter.lock().await.introspect().await?;

        info!(
            session_id = %input.session_id,
            database = %layout.name,
            table_count = layout.table_count(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Schema introspected"
        );
        Ok(layout)
    }
}
