use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content-addressed, deduplicating blob storage.
///
/// Blobs are immutable and never deleted. The store trusts the hash it is
/// given on `put`; callers should go through [`BlobStore::upload_if_absent`],
/// which computes it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob is stored under `hash`.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Store `data` under `hash` unless a blob is already there.
    async fn put(&self, hash: &ContentHash, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    /// Size of a stored blob in bytes.
    async fn size(&self, hash: &ContentHash) -> Result<u64, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Hash `data`, and write it only if the store does not have it yet.
    async fn upload_if_absent(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let hash = ContentHash::compute(data);
        if !self.exists(&hash).await? {
            self.put(&hash, data).await?;
        }
        Ok(hash)
    }
}
