//! Configuration handling for the SQL session server.
//!
//! Server-level settings come from CLI arguments and environment variables.
//! Per-session database settings arrive with each `connect` call and live in
//! [`crate::models::connection`].

use crate::db::registry::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_TTL_SECS,
    RegistryConfig,
};
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the SQL session server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-session-mcp",
    about = "MCP server that opens short-lived MySQL/PostgreSQL sessions for AI assistants",
    version,
    author
)]
pub struct Config {
    /// Maximum number of live sessions. The least recently used one is closed when full.
    #[arg(
        long,
        default_value_t = DEFAULT_SESSION_CAPACITY,
        env = "MCP_SESSION_CAPACITY"
    )]
    pub session_capacity: usize,

    /// Session lifetime in seconds, counted from connect. Use does not extend it.
    #[arg(
        long,
        default_value_t = DEFAULT_SESSION_TTL_SECS,
        env = "MCP_SESSION_TTL"
    )]
    pub session_ttl: u64,

    /// How often expired sessions are swept, in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CLEANUP_INTERVAL_SECS,
        env = "MCP_CLEANUP_INTERVAL"
    )]
    pub cleanup_interval: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            session_capacity: DEFAULT_SESSION_CAPACITY,
            session_ttl: DEFAULT_SESSION_TTL_SECS,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout.max(1))
    }

    /// Build the session registry settings.
    ///
    /// Capacity is clamped to at least one entry and every duration to at
    /// least one second.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            capacity: self.session_capacity.max(1),
            ttl: Duration::from_secs(self.session_ttl.max(1)),
            cleanup_interval: Duration::from_secs(self.cleanup_interval.max(1)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session_capacity, 100);
        assert_eq!(config.session_ttl, 300);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_registry_config_defaults() {
        let registry = Config::default().registry_config();
        assert_eq!(registry.capacity, 100);
        assert_eq!(registry.ttl, Duration::from_secs(300));
        assert_eq!(registry.cleanup_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_registry_config_clamps_zero_values() {
        let config = Config {
            session_capacity: 0,
            session_ttl: 0,
            cleanup_interval: 0,
            ..Config::default()
        };
        let registry = config.registry_config();
        assert_eq!(registry.capacity, 1);
        assert_eq!(registry.ttl, Duration::from_secs(1));
        assert_eq!(registry.cleanup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_connect_timeout_duration() {
        let config = Config {
            connect_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_parse_from_cli_args() {
        let config = Config::try_parse_from([
            "sql-session-mcp",
            "--session-capacity",
            "5",
            "--session-ttl",
            "60",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(config.session_capacity, 5);
        assert_eq!(config.session_ttl, 60);
        assert!(config.json_logs);
    }
}
