pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageNodeError {
    #[error("storage node request failed: {0}")]
    Http(String),

    #[error("storage node {url} rejected upload: {message}")]
    UploadRejected { url: String, message: String },

    #[error("kv rpc error: {0}")]
    Rpc(String),

    #[error("malformed kv response: {0}")]
    InvalidResponse(String),
}

/// Trait defining the storage-cluster operations: uploading encoded batch
/// payloads to the cluster nodes and publishing metadata records to the KV
/// stream the status API falls back to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageNodeClient: Send + Sync {
    /// Pushes one batch's concatenated encoded payload to every configured
    /// node.
    async fn upload_encoded_batch(&self, payload: Bytes) -> Result<(), StorageNodeError>;

    /// Publishes a metadata record under the configured stream, keyed by the
    /// blob's printable key bytes.
    async fn put_kv_entry(&self, key: &[u8], value: &[u8]) -> Result<(), StorageNodeError>;

    /// Reads a metadata record back. `None` when the stream holds no entry
    /// for the key.
    async fn get_kv_entry(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageNodeError>;
}
