//! File blob storage.

pub mod filesystem;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Blob storage backend trait.
///
/// Keys are content addresses (SHA-256 hex); the returned relative path is
/// what the assignment record stores and what the static file route serves.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content under the given key, returning the relative path
    async fn put(&self, key: &str, content: Bytes) -> Result<String>;

    /// Retrieve content by key
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Compute the content-address key for an upload.
pub fn content_key(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_sha256_hex() {
        let key = content_key(b"hello");
        assert_eq!(key.len(), 64);
        assert_eq!(
            key,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_content_key_differs_per_content() {
        assert_ne!(content_key(b"f1.pdf contents"), content_key(b"f2.pdf contents"));
    }
}
