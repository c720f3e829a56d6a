//! MCP tool implementations.
//!
//! This module contains all session tool handlers:
//! - `connection`: connect, disconnect, list_sessions
//! - `schema`: introspect
//! - `query`: execute
//! - `explain`: explain

pub mod connection;
pub mod explain;
pub mod query;
pub mod schema;

pub use connection::{ConnectionToolHandler, DisconnectInput, DisconnectOutput, ListSessionsOutput};
pub use explain::{ExplainInput, ExplainOutput, ExplainToolHandler, explain_sql};
pub use query::{ExecuteInput, QueryToolHandler};
pub use schema::{IntrospectInput, SchemaToolHandler};
