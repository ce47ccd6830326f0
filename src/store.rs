use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::EngineResult;

/// Durable string-to-string storage backing an observation log.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>>;

    /// Writes every entry or none of them.
    fn put_all(&mut self, entries: &[(&str, &str)]) -> EngineResult<()>;

    fn put(&mut self, key: &str, value: &str) -> EngineResult<()> {
        self.put_all(&[(key, value)])
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_all(&mut self, entries: &[(&str, &str)]) -> EngineResult<()> {
        for &(key, value) in entries {
            self.entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Key-value entries in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(target: "daypart::store", path = %path.as_ref().display(), "opened sqlite store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_all(&mut self, entries: &[(&str, &str)]) -> EngineResult<()> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for &(key, value) in entries {
            tx.execute(
                r#"
                INSERT INTO kv_entries (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (key) DO UPDATE
                SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value, updated_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
