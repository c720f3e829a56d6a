//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The adapter contract and the engine factory
//! - MySQL and PostgreSQL adapters over single connections
//! - Parameter binding and result-value mapping
//! - The session registry that keeps adapters alive between tool calls

pub mod adapter;
#[macro_use]
pub mod macros;
pub mod mysql;
pub mod params;
pub mod postgres;
pub mod registry;
pub mod types;

pub use adapter::{DatabaseAdapter, EngineAdapter, create_adapter};
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
pub use registry::{
    DisposeHook, RegistryConfig, RemovalCause, SessionRegistry, SharedAdapter,
    generate_session_id,
};
