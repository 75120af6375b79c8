use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use wk_core::{Error, KeyValueStore, Result};

pub const STATE_FILE: &str = "state.json";

/// Key-value state persisted as one JSON object. Every `set` rewrites the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens `<dir>/state.json`, creating the directory if needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create state directory {}: {}", dir.display(), e)))?;

        let path = dir.join(STATE_FILE);
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        // Held across the write so concurrent sets land in order. The map only
        // changes once the file does.
        let mut values = self.values.write().await;
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        let bytes = serde_json::to_vec_pretty(&next)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", self.path.display(), e)))?;
        *values = next;
        Ok(())
    }
}
