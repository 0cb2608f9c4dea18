//! Durable key-value storage for local backups
//!
//! The backup layer only needs put/get/delete by string key. Two backends
//! are provided:
//!
//! - `FileBackupStorage`: one JSON file per key inside a directory
//! - `MemoryBackupStorage`: a map behind a lock, for tests and ephemeral sessions

use crate::{Result, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Key-value storage that survives the editing session.
#[trait_variant::make(Send)]
pub trait BackupStorage: Send + Sync {
    /// Store a value, replacing any previous value for the key
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Fetch the value for a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove a key; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Keys become file names, so they share the document id character set
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// File-backed storage: `<directory>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated backup behind.
#[derive(Debug, Clone)]
pub struct FileBackupStorage {
    directory: PathBuf,
}

impl FileBackupStorage {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.directory.join(format!("{}.json", key)))
    }
}

impl BackupStorage for FileBackupStorage {
    async fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.directory).await?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryBackupStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackupStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl BackupStorage for MemoryBackupStorage {
    async fn put(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

impl<T: BackupStorage> BackupStorage for std::sync::Arc<T> {
    async fn put(&self, key: &str, value: String) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("backup.doc-1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
    }

    #[tokio::test]
    async fn test_file_storage_put_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileBackupStorage::new(temp_dir.path().join("backups"));

        assert_eq!(storage.get("backup.doc").await.unwrap(), None);

        storage.put("backup.doc", "first".to_string()).await.unwrap();
        storage.put("backup.doc", "second".to_string()).await.unwrap();
        assert_eq!(storage.get("backup.doc").await.unwrap().as_deref(), Some("second"));
        assert!(temp_dir.path().join("backups/backup.doc.json").exists());
        assert!(!temp_dir.path().join("backups/backup.doc.json.tmp").exists());

        storage.delete("backup.doc").await.unwrap();
        assert_eq!(storage.get("backup.doc").await.unwrap(), None);

        // Deleting twice is fine
        storage.delete("backup.doc").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_rejects_bad_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileBackupStorage::new(temp_dir.path());
        let result = storage.put("../../etc", "x".to_string()).await;
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryBackupStorage::new();
        assert!(storage.is_empty().await);

        storage.put("k", "v".to_string()).await.unwrap();
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));

        storage.delete("k").await.unwrap();
        assert!(storage.is_empty().await);
    }
}
