//! Opaque JSON blob persistence for the data model, backed by SQLite.
//!
//! The store is a plain key/value document table; the core never sees SQL and
//! the blob layout is exactly the wire shape of `contracts::DataModel`.
//! Loading hands back the raw JSON value so the caller can route legacy blobs
//! through migration before decoding.

use std::fmt;
use std::path::Path;

use contracts::DataModel;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

const MODEL_KEY: &str = "model";

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "model store is not attached"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct SqliteModelStore {
    conn: Connection,
}

impl SqliteModelStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// The stored model blob as raw JSON, or `None` when nothing was saved
    /// yet. Legacy blobs come back verbatim for the migration layer.
    pub fn load_value(&self) -> Result<Option<Value>, PersistenceError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM documents WHERE key = ?1",
                params![MODEL_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str::<Value>(&raw)?)),
            None => Ok(None),
        }
    }

    /// Load a current-shape model directly. Fails on legacy blobs; use
    /// [`Self::load_value`] plus migration when the shape is unknown.
    pub fn load(&self) -> Result<Option<DataModel>, PersistenceError> {
        match self.load_value()? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn save(&mut self, model: &DataModel) -> Result<(), PersistenceError> {
        let payload_json = serde_json::to_string(model)?;
        self.conn.execute(
            "INSERT INTO documents (key, payload_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                payload_json = excluded.payload_json,
                updated_at = excluded.updated_at",
            params![MODEL_KEY, payload_json, model.last_update.as_str()],
        )?;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                payload_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();

        std::env::temp_dir().join(format!("studio_store_{name}_{nanos}.sqlite"))
    }

    #[test]
    fn empty_store_loads_nothing() {
        let path = temp_db_path("empty");
        let store = SqliteModelStore::open(&path).expect("open store");

        assert!(store.load_value().expect("load").is_none());
        assert!(store.load().expect("load").is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_db_path("round_trip");
        let mut store = SqliteModelStore::open(&path).expect("open store");

        let mut model = DataModel::default();
        model.last_update = "1700000001".to_string();
        model.scenario.label = "Stored scenario".to_string();
        store.save(&model).expect("save");

        let loaded = store.load().expect("load").expect("model present");
        assert_eq!(loaded, model);

        // Saving again replaces the single blob.
        model.scenario.label = "Renamed".to_string();
        store.save(&model).expect("save again");
        let reloaded = store.load().expect("load").expect("model present");
        assert_eq!(reloaded.scenario.label, "Renamed");

        let _ = std::fs::remove_file(&path);
    }
}
