//! SQL Session MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to open time- and capacity-bounded sessions against MySQL and PostgreSQL,
//! introspect their schemas and run SQL.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::{DatabaseAdapter, EngineAdapter, SessionRegistry, create_adapter};
pub use error::{DbError, DbResult};
pub use mcp::SessionService;
