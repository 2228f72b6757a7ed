use std::sync::Mutex;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;
use tradedesk_models::config::StoreConfig;
use tradedesk_models::SupervisorState;
use uuid::Uuid;

use crate::error::StoreError;
use crate::sqlite::{SessionRow, SqliteSessions};

/// Session persistence: moka (hot) in front of SQLite (durable).
///
/// Saves write SQLite first, then refresh the hot entry. Loads are
/// read-through and promote SQLite hits. Hot entries hold the serialized
/// snapshot and expire after `memory_ttl`. `rusqlite::Connection` is not
/// `Sync`, hence the `Mutex`.
pub struct SessionStore {
    hot: Cache<Uuid, String>,
    sqlite: Mutex<SqliteSessions>,
}

impl SessionStore {
    pub fn new(sqlite: SqliteSessions, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            hot: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(memory_ttl)
                .build(),
            sqlite: Mutex::new(sqlite),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let sqlite = SqliteSessions::open(&config.sqlite_path)?;
        Ok(Self::new(
            sqlite,
            config.memory_max_capacity,
            Duration::from_secs(config.memory_ttl_seconds),
        ))
    }

    fn sqlite(&self) -> Result<std::sync::MutexGuard<'_, SqliteSessions>, StoreError> {
        self.sqlite
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Persist a snapshot of `state`, replacing any earlier one.
    pub async fn save(&self, state: &SupervisorState) -> Result<(), StoreError> {
        let row = SessionRow::from_state(state)?;
        self.sqlite()?.upsert(&row)?;
        self.hot.insert(state.session_id(), row.state_json).await;
        debug!(session = %row.session_id, "Session saved");
        Ok(())
    }

    pub async fn load(&self, session_id: Uuid) -> Result<Option<SupervisorState>, StoreError> {
        if let Some(json) = self.hot.get(&session_id).await {
            return Ok(Some(serde_json::from_str(&json)?));
        }

        let row = self.sqlite()?.get(&session_id.to_string())?;
        match row {
            Some(row) => {
                let state = row.state()?;
                self.hot.insert(session_id, row.state_json).await;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Drop the hot entry so the next load reads SQLite.
    pub async fn evict(&self, session_id: Uuid) {
        self.hot.invalidate(&session_id).await;
    }

    /// Most recently updated sessions, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRow>, StoreError> {
        self.sqlite()?.recent(limit)
    }

    pub fn hot_cache_size(&self) -> u64 {
        self.hot.entry_count()
    }
}
