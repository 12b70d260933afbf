use crate::errors::{AppError, AppResult};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value_json TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_value(&self, key: &str) -> AppResult<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row("SELECT value_json FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;

        match raw {
            Some(raw) => serde_json::from_str::<Value>(&raw)
                .map(Some)
                .map_err(|error| AppError::MalformedDocument(format!("{}: {}", key, error))),
            None => Ok(None),
        }
    }

    pub fn set_value(&self, key: &str, value: &Value) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO kv (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, serde_json::to_string(value)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Durable local store backed by one SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db: Arc<Database>,
}

impl SqliteKeyValueStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let db = Database::new(path)?;
        tracing::debug!(path = %db.path().display(), "opened sqlite store");
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let db = self.db.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || db.get_value(&key))
            .await
            .map_err(|error| AppError::Internal(error.to_string()))?
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let db = self.db.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || db.set_value(&key, &value))
            .await
            .map_err(|error| AppError::Internal(error.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::{Database, SqliteKeyValueStore};
    use crate::store::KeyValueStore;
    use serde_json::json;

    #[test]
    fn database_upserts_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("nested").join("test.sqlite")).expect("db");

        assert!(db.get_value("k").expect("get").is_none());
        db.set_value("k", &json!({ "a": 1 })).expect("first set");
        db.set_value("k", &json!({ "a": 2 })).expect("second set");
        assert_eq!(db.get_value("k").expect("get"), Some(json!({ "a": 2 })));
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.sqlite");

        {
            let store = SqliteKeyValueStore::open(&path).expect("open");
            store.set("doc", json!(["x"])).await.expect("set");
        }

        let reopened = SqliteKeyValueStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("doc").await.expect("get"), Some(json!(["x"])));
    }
}
