use crate::errors::{AppError, AppResult};
use crate::models::{StateDocument, STORAGE_KEY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Asynchronous local key/value storage holding JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> AppResult<()>;
}

/// In-process store. Counts writes and can be switched into a failing mode.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn insert_raw(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(format!("write to {} rejected", key)));
        }
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Reads and writes the whole state document under [`STORAGE_KEY`].
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Raw stored value, `None` on first run.
    pub async fn load(&self) -> AppResult<Option<Value>> {
        let value = self.backend.get(STORAGE_KEY).await?;
        tracing::debug!(present = value.is_some(), "loaded state document");
        Ok(value)
    }

    /// Full-document overwrite. Failures are returned, never retried.
    pub async fn save(&self, doc: &StateDocument) -> AppResult<()> {
        let value = serde_json::to_value(doc)?;
        match self.backend.set(STORAGE_KEY, value).await {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::warn!(error = %error, "state document save failed");
                Err(match error {
                    AppError::Persistence(message) => AppError::Persistence(message),
                    other => AppError::Persistence(other.to_string()),
                })
            }
        }
    }
}
