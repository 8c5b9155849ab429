//! services/client/src/adapters/file_storage.rs
//!
//! Durable `SessionStorage` backed by a single JSON object on disk, so the
//! session survives restarts of the CLI.

use async_trait::async_trait;
use health_record_core::ports::{PortError, PortResult, SessionStorage};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> PortResult<Map<String, Value>> {
        if !fs::try_exists(&self.path).await.map_err(storage_error)? {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path).await.map_err(storage_error)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(PortError::Storage(format!(
                "{:?} does not contain a JSON object",
                self.path
            ))),
            Err(e) => Err(PortError::Storage(format!(
                "Failed to parse {:?}: {}",
                self.path, e
            ))),
        }
    }

    /// Writes through a temporary file so a crash never leaves half a file.
    async fn save(&self, items: &Map<String, Value>) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        let content = serde_json::to_string_pretty(items)
            .map_err(|e| PortError::Storage(format!("Failed to serialize session: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.map_err(storage_error)?;
        fs::rename(&tmp_path, &self.path).await.map_err(storage_error)?;
        debug!("Session storage saved to {:?}", self.path);
        Ok(())
    }

    /// Loads for modification; an unreadable file is replaced rather than
    /// blocking sign-in forever.
    async fn load_for_write(&self) -> PortResult<Map<String, Value>> {
        match self.load().await {
            Ok(items) => Ok(items),
            Err(PortError::Storage(reason)) => {
                if !fs::try_exists(&self.path).await.unwrap_or(false) {
                    return Err(PortError::Storage(reason));
                }
                warn!("Discarding unreadable session storage: {}", reason);
                Ok(Map::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn storage_error(e: std::io::Error) -> PortError {
    PortError::Storage(e.to_string())
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let items = self.load().await?;
        Ok(items.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_for_write().await?;
        items.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&items).await
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_for_write().await?;
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.save(&items).await
    }
}
