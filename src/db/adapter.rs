//! Database capability contract and the adapter factory.
//!
//! Every engine adapter owns at most one physical connection and exposes the
//! same four operations: connect, disconnect, execute and introspect.
//! `EngineAdapter` is the closed set of supported engines; `create_adapter`
//! maps a raw `ConnectionConfig` onto it without touching the network.

use crate::db::mysql::MySqlAdapter;
use crate::db::postgres::PostgresAdapter;
use crate::dispatch_adapter;
use crate::error::DbResult;
use crate::models::{
    ConnectionConfig, ConnectionSettings, DatabaseEngine, DatabaseLayout, QueryRequest,
    QueryResult,
};
use std::future::Future;
use tracing::debug;

/// Operations every engine adapter provides.
///
/// All operations except `connect` and `disconnect` fail with
/// `DbError::NotConnected` when the adapter holds no live connection.
/// An adapter must not be driven by two callers at once.
pub trait DatabaseAdapter: Send {
    fn engine(&self) -> DatabaseEngine;

    fn settings(&self) -> &ConnectionSettings;

    fn is_connected(&self) -> bool;

    /// Open the physical connection. Calling it on a connected adapter is a
    /// logged no-op.
    fn connect(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Release the connection if present. Idempotent; close errors are
    /// logged, never returned.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    /// Run one SQL statement with positional parameters and materialize the
    /// whole result set.
    fn execute(
        &mut self,
        request: &QueryRequest,
    ) -> impl Future<Output = DbResult<QueryResult>> + Send;

    /// Snapshot every base table visible in the configured database.
    /// Any failing sub-query fails the whole call.
    fn introspect(&mut self) -> impl Future<Output = DbResult<DatabaseLayout>> + Send;
}

/// One adapter per supported engine.
#[derive(Debug)]
pub enum EngineAdapter {
    MySql(MySqlAdapter),
    Postgres(PostgresAdapter),
}

impl EngineAdapter {
    /// Build the adapter matching the settings' engine.
    pub fn from_settings(settings: ConnectionSettings) -> DbResult<Self> {
        match settings.engine {
            DatabaseEngine::MySql => MySqlAdapter::new(settings).map(Self::MySql),
            DatabaseEngine::Postgres => PostgresAdapter::new(settings).map(Self::Postgres),
        }
    }
}

impl DatabaseAdapter for EngineAdapter {
    fn engine(&self) -> DatabaseEngine {
        dispatch_adapter!(self, a => a.engine())
    }

    fn settings(&self) -> &ConnectionSettings {
        dispatch_adapter!(self, a => a.settings())
    }

    fn is_connected(&self) -> bool {
        dispatch_adapter!(self, a => a.is_connected())
    }

    async fn connect(&mut self) -> DbResult<()> {
        dispatch_adapter!(self, a => a.connect().await)
    }

    async fn disconnect(&mut self) {
        dispatch_adapter!(self, a => a.disconnect().await)
    }

    async fn execute(&mut self, request: &QueryRequest) -> DbResult<QueryResult> {
        dispatch_adapter!(self, a => a.execute(request).await)
    }

    async fn introspect(&mut self) -> DbResult<DatabaseLayout> {
        dispatch_adapter!(self, a => a.introspect().await)
    }
}

/// Validate a raw configuration and build the matching, disconnected adapter.
///
/// Performs no I/O. Structural problems and unknown engine tags are
/// reported as `DbError::Validation`.
pub fn create_adapter(config: &ConnectionConfig) -> DbResult<EngineAdapter> {
    let settings = config.validate()?;
    debug!(
        engine = %settings.engine,
        host = %settings.host,
        port = settings.port,
        database = %settings.database,
        "Creating database adapter"
    );
    EngineAdapter::from_settings(settings)
}

/// Build an actionable hint for a failed connection attempt.
pub(crate) fn connection_suggestion(engine: DatabaseEngine, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", engine);
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    format!(
        "Verify host, port (default {}) and that the {} server accepts connections",
        engine.default_port(),
        engine
    )
}
