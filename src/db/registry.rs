//! Session registry for live database connections across MCP tool calls.
//!
//! Maps opaque session ids to connected adapters. The registry is bounded in
//! two ways:
//! - capacity: inserting into a full registry evicts the least recently used
//!   session (a successful `get` counts as use)
//! - time: every session expires a fixed TTL after it was inserted; use does
//!   not extend it
//!
//! Every removal path (explicit remove, capacity eviction, expiry, shutdown)
//! hands the adapter to the disposal hook, which by default disconnects it.
//! Hook failures are logged and never reach the caller that triggered the
//! removal.

use crate::db::adapter::{DatabaseAdapter, EngineAdapter};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseEngine, SessionMetadata};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default maximum number of live sessions.
pub const DEFAULT_SESSION_CAPACITY: usize = 100;

/// Default session lifetime in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 300;

/// Default interval between expiry sweeps in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 30;

/// An adapter shared between the registry and in-flight operations.
pub type SharedAdapter = Arc<Mutex<EngineAdapter>>;

/// Callback run for every removed session.
pub type DisposeHook =
    Arc<dyn Fn(String, SharedAdapter, RemovalCause) -> BoxFuture<'static, DbResult<()>> + Send + Sync>;

/// Why a session left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Removed on request (disconnect)
    Explicit,
    /// Evicted as least recently used to make room
    Capacity,
    /// Outlived its TTL
    Expired,
    /// Registry closed at shutdown
    Shutdown,
    /// Never stored because its id was already live
    Rejected,
}

impl std::fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Capacity => write!(f, "capacity"),
            Self::Expired => write!(f, "expired"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Registry bounds.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub capacity: usize,
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SESSION_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

struct SessionEntry {
    adapter: SharedAdapter,
    engine: DatabaseEngine,
    database: String,
    created_at: Instant,
    /// Insertion stamp from `SessionTable::tick`
    inserted: u64,
    /// Recency stamp from `SessionTable::tick`; smallest is least recently used
    last_used: u64,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

#[derive(Default)]
struct SessionTable {
    entries: HashMap<String, SessionEntry>,
    tick: u64,
}

impl SessionTable {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn take_expired(&mut self, ttl: Duration) -> Vec<(String, SessionEntry)> {
        let expired_ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(id, _)| id.clone())
            .collect();

        expired_ids
            .into_iter()
            .filter_map(|id| self.entries.remove_entry(&id))
            .collect()
    }

    fn take_least_recently_used(&mut self) -> Option<(String, SessionEntry)> {
        let lru_id = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone())?;
        self.entries.remove_entry(&lru_id)
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<SessionTable>>,
    config: RegistryConfig,
    dispose: DisposeHook,
    /// System start time for converting Instant to DateTime
    system_start_instant: Instant,
    /// System start time as UTC DateTime
    system_start_datetime: DateTime<Utc>,
}

impl SessionRegistry {
    /// Create a registry with default bounds (100 sessions, 5 minute TTL).
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given bounds and the default disposal hook.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionTable::default())),
            config,
            dispose: default_dispose_hook(),
            system_start_instant: Instant::now(),
            system_start_datetime: Utc::now(),
        }
    }

    /// Replace the disposal hook run for every removed session.
    pub fn on_dispose<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(String, SharedAdapter, RemovalCause) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DbResult<()>> + Send + 'static,
    {
        self.dispose = Arc::new(move |id: String, adapter: SharedAdapter, cause: RemovalCause| {
            hook(id, adapter, cause).boxed()
        });
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start a background task that sweeps expired sessions.
    ///
    /// This should be called once when the server starts.
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.cleanup_interval);
            loop {
                interval.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "Swept expired sessions");
                }
            }
        })
    }

    /// Store a connected adapter under a fresh session id and return the id.
    pub async fn register(&self, adapter: EngineAdapter) -> DbResult<String> {
        let session_id = generate_session_id();
        self.put(session_id.clone(), adapter).await?;
        Ok(session_id)
    }

    /// Insert an adapter under `session_id`.
    ///
    /// Expired sessions are dropped first; if the registry is still full the
    /// least recently used session is evicted. An id that is already live is
    /// rejected and the adapter passed in is disposed.
    pub async fn put(&self, session_id: impl Into<String>, adapter: EngineAdapter) -> DbResult<()> {
        let session_id = session_id.into();
        let engine = adapter.engine();
        let database = adapter.settings().database.clone();

        let mut removed = Vec::new();
        let mut rejected = None;
        {
            let mut table = self.sessions.write().await;
            removed.extend(
                table
                    .take_expired(self.config.ttl)
                    .into_iter()
                    .map(|(id, entry)| (id, entry, RemovalCause::Expired)),
            );

            if table.entries.contains_key(&session_id) {
                rejected = Some(adapter);
            } else {
                while table.entries.len() >= self.config.capacity.max(1) {
                    match table.take_least_recently_used() {
                        Some((id, entry)) => removed.push((id, entry, RemovalCause::Capacity)),
                        None => break,
                    }
                }
                let last_used = table.next_tick();
                table.entries.insert(
                    session_id.clone(),
                    SessionEntry {
                        adapter: Arc::new(Mutex::new(adapter)),
                        engine,
                        database: database.clone(),
                        created_at: Instant::now(),
                        inserted: last_used,
                        last_used,
                    },
                );
            }
        }

        for (id, entry, cause) in removed {
            self.spawn_dispose(id, entry, cause);
        }

        // The caller's adapter may hold a live connection; dispose it like any other.
        if let Some(adapter) = rejected {
            tokio::spawn(run_dispose(
                self.dispose.clone(),
                session_id.clone(),
                Arc::new(Mutex::new(adapter)),
                RemovalCause::Rejected,
            ));
            return Err(DbError::validation(format!(
                "Session id '{}' is already in use",
                session_id
            )));
        }

        info!(
            session_id = %session_id,
            engine = %engine,
            database = %database,
            ttl_secs = self.config.ttl.as_secs(),
            "Session registered"
        );
        Ok(())
    }

    /// Look up a live session and mark it as used.
    ///
    /// Returns `None` for unknown ids and for sessions past their TTL; an
    /// expired session found here is removed and disposed.
    pub async fn get(&self, session_id: &str) -> Option<SharedAdapter> {
        let mut table = self.sessions.write().await;
        let expired = table.entries.get(session_id)?.is_expired(self.config.ttl);

        if expired {
            let entry = table.entries.remove(session_id)?;
            drop(table);
            debug!(session_id = %session_id, "Session expired on lookup");
            self.spawn_dispose(session_id.to_string(), entry, RemovalCause::Expired);
            return None;
        }

        let tick = table.next_tick();
        let entry = table.entries.get_mut(session_id)?;
        entry.last_used = tick;
        Some(entry.adapter.clone())
    }

    /// Like [`get`](Self::get), but a miss is a `SessionNotFound` error.
    pub async fn require(&self, session_id: &str) -> DbResult<SharedAdapter> {
        self.get(session_id)
            .await
            .ok_or_else(|| DbError::session_not_found(session_id))
    }

    /// Remove a session and dispose it. Returns false if the id was not live.
    pub async fn remove(&self, session_id: &str) -> bool {
        let entry = {
            let mut table = self.sessions.write().await;
            table.entries.remove(session_id)
        };

        match entry {
            Some(entry) if entry.is_expired(self.config.ttl) => {
                self.spawn_dispose(session_id.to_string(), entry, RemovalCause::Expired);
                false
            }
            Some(entry) => {
                info!(session_id = %session_id, "Session removed");
                self.spawn_dispose(session_id.to_string(), entry, RemovalCause::Explicit);
                true
            }
            None => false,
        }
    }

    /// Remove and dispose every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let expired = {
            let mut table = self.sessions.write().await;
            table.take_expired(self.config.ttl)
        };

        let count = expired.len();
        for (id, entry) in expired {
            warn!(session_id = %id, database = %entry.database, "Closing expired session");
            self.spawn_dispose(id, entry, RemovalCause::Expired);
        }
        count
    }

    /// Check whether a session is live without marking it as used.
    pub async fn contains(&self, session_id: &str) -> bool {
        let table = self.sessions.read().await;
        table
            .entries
            .get(session_id)
            .is_some_and(|entry| !entry.is_expired(self.config.ttl))
    }

    /// List all live sessions with their metadata.
    ///
    /// This method does not affect recency.
    pub async fn list_all(&self) -> Vec<SessionMetadata> {
        let table = self.sessions.read().await;
        let mut sessions: Vec<(u64, SessionMetadata)> = table
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(self.config.ttl))
            .map(|(id, entry)| {
                let age = entry.created_at.elapsed();
                // Convert Instant to DateTime by calculating offset from system start
                let offset_from_start = entry
                    .created_at
                    .saturating_duration_since(self.system_start_instant);
                let started_at = self.system_start_datetime + offset_from_start;

                let metadata = SessionMetadata {
                    session_id: id.clone(),
                    engine: entry.engine,
                    database: entry.database.clone(),
                    started_at: started_at.to_rfc3339(),
                    age_secs: age.as_secs(),
                    expires_in_secs: self.config.ttl.saturating_sub(age).as_secs(),
                };
                (entry.inserted, metadata)
            })
            .collect();

        sessions.sort_by_key(|(inserted, _)| *inserted);
        sessions.into_iter().map(|(_, metadata)| metadata).collect()
    }

    /// Get the number of live sessions.
    pub async fn count(&self) -> usize {
        let table = self.sessions.read().await;
        table
            .entries
            .values()
            .filter(|entry| !entry.is_expired(self.config.ttl))
            .count()
    }

    /// Remove every session and wait for all of them to be disposed.
    pub async fn close_all(&self) {
        let drained: Vec<(String, SessionEntry)> = {
            let mut table = self.sessions.write().await;
            table.entries.drain().collect()
        };

        if drained.is_empty() {
            return;
        }

        info!(count = drained.len(), "Closing all sessions");
        let disposals = drained.into_iter().map(|(id, entry)| {
            run_dispose(
                self.dispose.clone(),
                id,
                entry.adapter,
                RemovalCause::Shutdown,
            )
        });
        join_all(disposals).await;
    }

    fn spawn_dispose(&self, session_id: String, entry: SessionEntry, cause: RemovalCause) {
        tokio::spawn(run_dispose(
            self.dispose.clone(),
            session_id,
            entry.adapter,
            cause,
        ));
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_dispose(
    hook: DisposeHook,
    session_id: String,
    adapter: SharedAdapter,
    cause: RemovalCause,
) {
    debug!(session_id = %session_id, cause = %cause, "Disposing session");
    if let Err(e) = hook(session_id.clone(), adapter, cause).await {
        warn!(
            session_id = %session_id,
            cause = %cause,
            error = %e,
            "Session disposal failed"
        );
    }
}

/// Disconnects the adapter once no operation holds it.
fn default_dispose_hook() -> DisposeHook {
    Arc::new(|session_id: String, adapter: SharedAdapter, cause: RemovalCause| {
        async move {
            let mut adapter = adapter.lock().await;
            adapter.disconnect().await;
            debug!(session_id = %session_id, cause = %cause, "Session connection released");
            Ok(())
        }
        .boxed()
    })
}

/// Generate a unique session ID.
pub fn generate_session_id() -> String {
    format!("sess_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with("sess_"));
        assert_eq!(id.len(), 5 + 32); // "sess_" + 32 hex chars
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_removal_cause_display() {
        assert_eq!(RemovalCause::Capacity.to_string(), "capacity");
        assert_eq!(RemovalCause::Expired.to_string(), "expired");
        assert_eq!(RemovalCause::Rejected.to_string(), "rejected");
    }

    #[tokio::test]
    async fn test_registry_creation() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.count().await, 0);
        assert!(registry.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.get("sess_nonexistent").await.is_none());
        assert!(!registry.remove("sess_nonexistent").await);
        let err = registry.require("sess_nonexistent").await.unwrap_err();
        assert!(matches!(err, DbError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_close_all_on_empty_registry() {
        let registry = SessionRegistry::new();
        registry.close_all().await;
        assert_eq!(registry.count().await, 0);
    }

    #[test]
    fn test_take_least_recently_used_on_empty_table() {
        let mut table = SessionTable::default();
        assert!(table.take_least_recently_used().is_none());
        assert_eq!(table.next_tick(), 1);
        assert_eq!(table.next_tick(), 2);
    }
}
