//! Per-browser key/value session storage.
//!
//! The encoder writes long selections here and the change view reads them back.
//! Entries are never deleted by the mass edit code; the whole session expires
//! after the configured TTL.

use crate::error::MassEditError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn save(&mut self) -> Result<(), MassEditError>;
}

/// Session kept in memory only. Used when the browser has no session yet, and in tests.
#[derive(Debug, Default)]
pub struct MemorySession {
    data: HashMap<String, String>,
    saves: usize,
}

impl MemorySession {
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), MassEditError> {
        self.saves += 1;
        Ok(())
    }
}

/// Session persisted as one JSON document per key in the `sessions` table.
pub struct SqliteSession<'c> {
    conn: &'c Connection,
    session_key: String,
    data: HashMap<String, String>,
    modified: bool,
    ttl: Duration,
}

impl<'c> SqliteSession<'c> {
    pub fn new_key() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Loads the session; an unknown or expired key starts empty.
    pub fn load(
        conn: &'c Connection,
        session_key: &str,
        ttl: Duration,
    ) -> Result<Self, MassEditError> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM sessions WHERE session_key = ?1 AND expire_at > ?2",
                params![session_key, unix_now()],
                |row| row.get(0),
            )
            .optional()?;

        let data = match raw {
            Some(raw) => serde_json::from_str(&raw)?,
            None => HashMap::new(),
        };

        Ok(Self {
            conn,
            session_key: session_key.to_string(),
            data,
            modified: false,
            ttl,
        })
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }
}

impl SessionStore for SqliteSession<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.insert(key.to_string(), value);
        self.modified = true;
    }

    fn save(&mut self) -> Result<(), MassEditError> {
        if !self.modified {
            return Ok(());
        }
        let expire_at = unix_now() + self.ttl.as_secs() as i64;
        self.conn.execute(
            "INSERT INTO sessions (session_key, data, expire_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_key) DO UPDATE SET data = excluded.data, expire_at = excluded.expire_at",
            params![self.session_key, serde_json::to_string(&self.data)?, expire_at],
        )?;
        self.modified = false;
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
