//! Session lifecycle tools.
//!
//! This module implements the `connect`, `disconnect` and `list_sessions`
//! MCP tools. A session is one connected adapter stored in the
//! `SessionRegistry` under a freshly generated id.

use crate::db::{DatabaseAdapter, SessionRegistry, create_adapter};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, SessionInfo, SessionMetadata};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Input for the disconnect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DisconnectInput {
    /// Session ID returned by connect
    pub session_id: String,
}

/// Output from the disconnect tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DisconnectOutput {
    pub session_id: String,
    pub disconnected: bool,
}

/// Output from the list_sessions tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListSessionsOutput {
    /// Live sessions, oldest first
    pub sessions: Vec<SessionMetadata>,
    pub count: usize,
}

/// Handler for the session lifecycle tools.
pub struct ConnectionToolHandler {
    registry: Arc<SessionRegistry>,
    connect_timeout: Duration,
}

impl ConnectionToolHandler {
    /// Create a new connection tool handler.
    pub fn new(registry: Arc<SessionRegistry>, connect_timeout: Duration) -> Self {
        Self {
            registry,
            connect_timeout,
        }
    }

    /// Handle the connect tool call.
    ///
    /// The adapter is registered only after its handshake succeeds within the
    /// connect timeout; on any failure it is dropped unregistered.
    pub async fn connect(&self, config: ConnectionConfig) -> DbResult<SessionInfo> {
        let start = Instant::now();
        let mut adapter = create_adapter(&config)?;

        match tokio::time::timeout(self.connect_timeout, adapter.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(
                    engine = %adapter.engine(),
                    host = %adapter.settings().host,
                    database = %adapter.settings().database,
                    error = %e,
                    "Connect failed"
                );
                return Err(e);
            }
            Err(_) => {
                let elapsed_secs = start.elapsed().as_secs() as u32;
                warn!(
                    engine = %adapter.engine(),
                    host = %adapter.settings().host,
                    timeout_secs = self.connect_timeout.as_secs(),
                    "Connect timed out"
                );
                return Err(DbError::timeout("connect", elapsed_secs));
            }
        }

        let settings = adapter.settings().clone();
        let session_id = self.registry.register(adapter).await?;

        info!(
            session_id = %session_id,
            engine = %settings.engine,
            host = %settings.host,
            database = %settings.database,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Session opened"
        );

        Ok(SessionInfo {
            session_id,
            engine: settings.engine,
            host: settings.host,
            port: settings.port,
            database: settings.database,
            expires_in_secs: self.registry.config().ttl.as_secs(),
        })
    }

    /// Handle the disconnect tool call.
    pub async fn disconnect(&self, input: DisconnectInput) -> DbResult<DisconnectOutput> {
        if !self.registry.remove(&input.session_id).await {
            return Err(DbError::session_not_found(input.session_id));
        }

        Ok(DisconnectOutput {
            session_id: input.session_id,
            disconnected: true,
        })
    }

    /// Handle the list_sessions tool call.
    pub async fn list_sessions(&self) -> ListSessionsOutput {
        let sessions = self.registry.list_all().await;
        let count = sessions.len();
        ListSessionsOutput { sessions, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ConnectionToolHandler {
        ConnectionToolHandler::new(Arc::new(SessionRegistry::new()), Duration::from_secs(1))
    }

    #[test]
    fn test_disconnect_input_deserialization() {
        let input: DisconnectInput =
            serde_json::from_str(r#"{"session_id": "sess_abc"}"#).unwrap();
        assert_eq!(input.session_id, "sess_abc");
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_engine_before_network() {
        let handler = handler();
        let config = ConnectionConfig::new("sqlite", "shop", "app", "");
        let err = handler.connect(config).await.unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
        assert_eq!(handler.list_sessions().await.count, 0);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_session() {
        let handler = handler();
        let err = handler
            .disconnect(DisconnectInput {
                session_id: "sess_missing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_sessions_empty() {
        let output = handler().list_sessions().await;
        assert!(output.sessions.is_empty());
        assert_eq!(output.count, 0);
    }
}
