pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object stream error: {0}")]
    ObjectStreamError(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Trait defining object storage operations. Values are opaque bytes keyed by
/// strings; the blob store layers its key scheme on top.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError>;

    async fn put_data(&self, data: Bytes, key: &str) -> Result<(), StorageError>;

    async fn delete_data(&self, key: &str) -> Result<(), StorageError>;
}
