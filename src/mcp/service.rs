//! MCP service implementation using rmcp.
//!
//! This module defines the SessionService struct with all session tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::SessionRegistry;
use crate::models::{ConnectionConfig, DatabaseLayout, QueryResult, SessionInfo};
use crate::tools::connection::{
    ConnectionToolHandler, DisconnectInput, DisconnectOutput, ListSessionsOutput,
};
use crate::tools::explain::{ExplainInput, ExplainOutput, ExplainToolHandler};
use crate::tools::query::{ExecuteInput, QueryToolHandler};
use crate::tools::schema::{IntrospectInput, SchemaToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SessionService {
    /// Shared registry of live sessions
    registry: Arc<SessionRegistry>,
    /// Upper bound on a connect handshake
    connect_timeout: Duration,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SessionService {
    /// Create a new SessionService instance.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared session registry
    /// * `connect_timeout` - Upper bound on a connect handshake
    pub fn new(registry: Arc<SessionRegistry>, connect_timeout: Duration) -> Self {
        Self {
            registry,
            connect_timeout,
            tool_router: Self::tool_router(),
        }
    }

    /// Validate session ID - ensure it is provided and non-empty.
    ///
    /// Returns the trimmed session ID if valid, otherwise returns an error
    /// guiding the user to call connect first.
    fn validate_session_id(&self, provided: &str) -> Result<String, McpError> {
        let trimmed = provided.trim();
        if trimmed.is_empty() {
            Err(McpError::invalid_params(
                "session_id is required. Call connect first to open a session.",
                None,
            ))
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn connection_handler(&self) -> ConnectionToolHandler {
        ConnectionToolHandler::new(self.registry.clone(), self.connect_timeout)
    }
}

#[tool_router]
impl SessionService {
    #[tool(
        description = "Open a database session.\nengine is \"mysql\" or \"postgres\"; host defaults to localhost and port to the engine default (3306/5432).\nReturns a session_id for introspect/execute/explain. Sessions expire a fixed time after connect."
    )]
    async fn connect(
        &self,
        Parameters(config): Parameters<ConnectionConfig>,
    ) -> Result<Json<SessionInfo>, McpError> {
        self.connection_handler()
            .connect(config)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Close a database session and release its connection.")]
    async fn disconnect(
        &self,
        Parameters(input): Parameters<DisconnectInput>,
    ) -> Result<Json<DisconnectOutput>, McpError> {
        let mut input = input;
        input.session_id = self.validate_session_id(&input.session_id)?;
        self.connection_handler()
            .disconnect(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List live database sessions.\nReturns session IDs, engines, databases, start times and seconds until expiry."
    )]
    async fn list_sessions(&self) -> Json<ListSessionsOutput> {
        Json(self.connection_handler().list_sessions().await)
    }

    #[tool(
        description = "Describe every base table in the session's database.\nReturns columns (type, nullability, default, primary key) and foreign keys per table."
    )]
    async fn introspect(
        &self,
        Parameters(input): Parameters<IntrospectInput>,
    ) -> Result<Json<DatabaseLayout>, McpError> {
        let mut input = input;
        input.session_id = self.validate_session_id(&input.session_id)?;
        let handler = SchemaToolHandler::new(self.registry.clone());
        handler
            .introspect(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a SQL statement on a session and return all rows.\nSupports positional parameters (? for MySQL, $1,$2... for PostgreSQL).\nRows are arrays aligned with columns."
    )]
    async fn execute(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<Json<QueryResult>, McpError> {
        let mut input = input;
        input.session_id = self.validate_session_id(&input.session_id)?;
        let handler = QueryToolHandler::new(self.registry.clone());
        handler
            .execute(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Show the execution plan of a statement using EXPLAIN.\nWith analyze=true runs EXPLAIN ANALYZE, which executes the statement."
    )]
    async fn explain(
        &self,
        Parameters(input): Parameters<ExplainInput>,
    ) -> Result<Json<ExplainOutput>, McpError> {
        let mut input = input;
        input.session_id = self.validate_session_id(&input.session_id)?;
        let handler = ExplainToolHandler::new(self.registry.clone());
        handler
            .explain(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for SessionService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("SQL Session MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Session-based tools for MySQL and PostgreSQL databases.\n\
                \n\
                ## Workflow\n\
                1. Call `connect` with engine, host, port, database, username and password\n\
                2. Use the returned `session_id` in `introspect`, `execute` and `explain`\n\
                3. Call `disconnect` when done\n\
                \n\
                ## Sessions\n\
                - Sessions expire a fixed time after connect, even while in use\n\
                - The least recently used session is closed when the server is full\n\
                - An unknown or expired `session_id` means the session is gone: call `connect` again\n\
                - `list_sessions` shows live sessions and their remaining lifetime\n\
                \n\
                ## Statements\n\
                - Statements are not filtered; writes and DDL run as given\n\
                - MySQL uses `?` placeholders, PostgreSQL uses `$1, $2, ...`\n\
                - `explain` with `analyze: true` executes the statement"
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> SessionService {
        SessionService::new(Arc::new(SessionRegistry::new()), Duration::from_secs(5))
    }

    #[test]
    fn test_validate_session_id_trims_whitespace() {
        let service = create_test_service();
        assert_eq!(
            service.validate_session_id("  sess_1  ").unwrap(),
            "sess_1"
        );
    }

    #[test]
    fn test_validate_session_id_rejects_empty() {
        let service = create_test_service();
        let err = service.validate_session_id("   ").unwrap_err();
        assert!(err.to_string().contains("session_id is required"));
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "sql-session-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("connect"));
    }

    #[test]
    fn test_tools_registered() {
        let service = create_test_service();
        let names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        for expected in [
            "connect",
            "disconnect",
            "list_sessions",
            "introspect",
            "execute",
            "explain",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
    }
}
