use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::ProgressRecord;

pub const PROGRESS_KEY: &str = "lyricloop.progress";

/// Local string key-value storage. One blob per key, last write wins.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<bool>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.values.borrow_mut().remove(key).is_some())
    }
}

/// Loads and saves the progress record as a JSON blob.
///
/// Clones share the underlying store, so several engines constructed over the
/// same handle always observe each other's writes. Storage failures never
/// surface: a bad read yields the default record, a failed write keeps the
/// unsaved record in memory and `load` returns it until a later write lands.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Rc<dyn KeyValueStore>,
    unsaved: Rc<RefCell<Option<ProgressRecord>>>,
}

impl ProgressStore {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            unsaved: Rc::new(RefCell::new(None)),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::new()))
    }

    pub fn load(&self) -> ProgressRecord {
        if let Some(record) = self.unsaved.borrow().as_ref() {
            return record.clone();
        }

        match self.kv.get(PROGRESS_KEY) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                log::warn!("stored progress is unreadable, starting fresh: {e}");
                ProgressRecord::default()
            }),
            Ok(None) => ProgressRecord::default(),
            Err(e) => {
                log::warn!("failed to read progress, starting fresh: {e}");
                ProgressRecord::default()
            }
        }
    }

    pub fn save(&self, record: &ProgressRecord) {
        let written = serde_json::to_string(record)
            .map_err(Error::from)
            .and_then(|blob| self.kv.set(PROGRESS_KEY, &blob));

        match written {
            Ok(()) => {
                self.unsaved.borrow_mut().take();
            }
            Err(e) => {
                log::warn!("failed to save progress: {e}");
                *self.unsaved.borrow_mut() = Some(record.clone());
            }
        }
    }

    pub fn clear(&self) -> Result<bool> {
        self.unsaved.borrow_mut().take();
        self.kv.remove(PROGRESS_KEY)
    }
}
