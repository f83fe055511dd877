//! Filesystem storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::StorageBackend;
use crate::error::{AppError, Result};

/// Filesystem-based storage backend
pub struct FilesystemStorage {
    base_path: PathBuf,
}

impl FilesystemStorage {
    /// Create new filesystem storage
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Relative path for a key (first 2 chars as subdirectory for distribution)
    fn relative_path(key: &str) -> String {
        let prefix = &key[..2.min(key.len())];
        format!("{}/{}", prefix, key)
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::relative_path(key))
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, key: &str, content: Bytes) -> Result<String> {
        let path = self.key_to_path(key);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write content
        let mut file = fs::File::create(&path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;

        Ok(Self::relative_path(key))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.key_to_path(key);
        let content = fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", key, e)))?;
        Ok(Bytes::from(content))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.key_to_path(key);
        Ok(path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_storage() -> FilesystemStorage {
        let dir = std::env::temp_dir().join(format!("coursedesk-test-{}", Uuid::new_v4()));
        FilesystemStorage::new(dir)
    }

    #[test]
    fn test_relative_path_shards_by_prefix() {
        assert_eq!(
            FilesystemStorage::relative_path("abcdef123456"),
            "ab/abcdef123456"
        );
    }

    #[test]
    fn test_relative_path_short_key() {
        assert_eq!(FilesystemStorage::relative_path("a"), "a/a");
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let storage = temp_storage();
        let relative = storage
            .put("deadbeef", Bytes::from_static(b"assignment body"))
            .await
            .unwrap();
        assert_eq!(relative, "de/deadbeef");
        assert!(storage.exists("deadbeef").await.unwrap());
        let content = storage.get("deadbeef").await.unwrap();
        assert_eq!(&content[..], b"assignment body");
    }

    #[tokio::test]
    async fn test_get_missing_key_is_storage_error() {
        let storage = temp_storage();
        let err = storage.get("cafebabe").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
