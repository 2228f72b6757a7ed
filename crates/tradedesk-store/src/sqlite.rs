use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tradedesk_models::SupervisorState;

use crate::error::StoreError;

pub const SESSIONS_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    user_query TEXT NOT NULL,
    state_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions (updated_at);";

/// One persisted session snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub session_id: String,
    pub user_query: String,
    pub state_json: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionRow {
    /// Snapshot a state, stamped with the current time as `updated_at`.
    pub fn from_state(state: &SupervisorState) -> Result<Self, StoreError> {
        Ok(Self {
            session_id: state.session_id().to_string(),
            user_query: state.user_query().to_string(),
            state_json: serde_json::to_string(state)?,
            created_at: state.created_at().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn state(&self) -> Result<SupervisorState, StoreError> {
        Ok(serde_json::from_str(&self.state_json)?)
    }
}

/// SQLite-backed session table.
pub struct SqliteSessions {
    conn: Connection,
}

impl SqliteSessions {
    /// Open (creating if needed) the session database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SESSIONS_TABLE_DDL)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SESSIONS_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Insert or replace a snapshot. `created_at` of an existing row is kept.
    pub fn upsert(&self, row: &SessionRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO sessions (session_id, user_query, state_json, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(session_id) DO UPDATE SET \
             user_query = excluded.user_query, \
             state_json = excluded.state_json, \
             updated_at = excluded.updated_at",
            rusqlite::params![
                row.session_id,
                row.user_query,
                row.state_json,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, session_id: &str) -> Result<Option<SessionRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT session_id, user_query, state_json, created_at, updated_at \
             FROM sessions WHERE session_id = ?1",
        )?;
        let row = stmt
            .query_row(rusqlite::params![session_id], |row| {
                Ok(SessionRow {
                    session_id: row.get(0)?,
                    user_query: row.get(1)?,
                    state_json: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Most recently updated sessions first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT session_id, user_query, state_json, created_at, updated_at \
             FROM sessions ORDER BY updated_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(SessionRow {
                    session_id: row.get(0)?,
                    user_query: row.get(1)?,
                    state_json: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
