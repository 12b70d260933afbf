use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub message_timeout_ms: u64,
    pub log_filter: String,
    pub database_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            message_timeout_ms: 5_000,
            log_filter: "info".to_string(),
            database_file: "state.sqlite".to_string(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `<data_dir>/settings.json` when it exists.
    pub fn load(data_dir: &Path) -> AppResult<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        let update: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|error| AppError::Internal(format!("{}: {}", path.display(), error)))?;
        Self::default().merged(update)
    }

    /// Applies a partial JSON update and writes the result to disk.
    pub fn update(data_dir: &Path, update: serde_json::Value) -> AppResult<Self> {
        let settings = Self::load(data_dir)?.merged(update)?;
        fs::create_dir_all(data_dir)?;
        fs::write(data_dir.join(SETTINGS_FILE), serde_json::to_string_pretty(&settings)?)?;
        Ok(settings)
    }

    /// Sets one named key. `raw` is read as JSON when it parses, else as a string.
    pub fn set_key(data_dir: &Path, key: &str, raw: &str) -> AppResult<Self> {
        let known = serde_json::to_value(Self::default())?;
        if known.get(key).is_none() {
            return Err(AppError::Validation(format!("unknown setting: {}", key)));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        let mut update = serde_json::Map::new();
        update.insert(key.to_string(), value);
        Self::update(data_dir, serde_json::Value::Object(update))
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }

    fn merged(self, update: serde_json::Value) -> AppResult<Self> {
        let mut merged = serde_json::to_value(self)?;
        merge_json(&mut merged, update);
        Ok(serde_json::from_value(merged)?)
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
