// Scoped key-value storage backends
// Secure storage on device, a plain persistent substitute on web builds

use async_trait::async_trait;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Io(String),
    Serialization(String),
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "I/O error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Async string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, lost on restart
pub struct MemoryKeyValueStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        values.remove(key);
        Ok(())
    }
}

lazy_static! {
    // One writer lock per store file, shared by every scope opened on it
    static ref FILE_LOCKS: StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>> =
        StdMutex::new(HashMap::new());
}

fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = FILE_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

async fn read_entries(path: &Path) -> Result<HashMap<String, String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            StorageError::Serialization(format!(
                "Failed to parse store '{}': {}",
                path.display(),
                e
            ))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(StorageError::Io(format!(
            "Failed to read store '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Durable JSON-file store scoped to one installation.
///
/// Every key is prefixed with the scope. Writes re-read the file under a
/// per-path lock and change only the written key, so scopes sharing a file
/// keep each other's entries. The file is replaced through a uniquely named
/// temporary sibling and a rename.
///
/// The lock covers stores opened in this process only.
pub struct FileKeyValueStore {
    path: PathBuf,
    scope: String,
    lock: Arc<Mutex<()>>,
    values: RwLock<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open (or create on first write) the store at `path`
    pub async fn open<P: AsRef<Path>>(path: P, scope: &str) -> Result<Self, StorageError> {
        let path = std::path::absolute(path.as_ref())
            .map_err(|e| StorageError::Io(format!("Invalid store path: {}", e)))?;
        let prefix = format!("{}.", scope);

        let values: HashMap<String, String> = read_entries(&path)
            .await?
            .into_iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .collect();

        info!(
            "Opened key-value store {} (scope '{}', {} entries)",
            path.display(),
            scope,
            values.len()
        );

        Ok(Self {
            lock: file_lock(&path),
            path,
            scope: scope.to_string(),
            values: RwLock::new(values),
        })
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}.{}", self.scope, key)
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());

        self.path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            self.scope,
            Uuid::new_v4().simple()
        ))
    }

    /// Apply one change to the file's current contents and write it back
    async fn write_through(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        let mut entries = read_entries(&self.path).await?;
        match value {
            Some(value) => entries.insert(key.to_string(), value.to_string()),
            None => entries.remove(key),
        };

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!("Flushed {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().await;
        Ok(values.get(&self.scoped_key(key)).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let scoped = self.scoped_key(key);
        let mut values = self.values.write().await;
        self.write_through(&scoped, Some(value)).await?;
        values.insert(scoped, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let scoped = self.scoped_key(key);
        let mut values = self.values.write().await;
        if values.contains_key(&scoped) {
            self.write_through(&scoped, None).await?;
            values.remove(&scoped);
        }
        Ok(())
    }
}
