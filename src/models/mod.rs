//! Data models for the SQL session server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, ConnectionSettings, DEFAULT_HOST, DatabaseEngine, SessionInfo,
    SessionMetadata,
};
pub use query::{QueryParam, QueryRequest, QueryResult};
pub use schema::{ColumnSchema, DatabaseLayout, ForeignKeySchema, TableSchema};
