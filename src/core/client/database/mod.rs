pub mod mongodb;

use alloy::primitives::B256;
use async_trait::async_trait;
use thiserror::Error;

use crate::types::key::BlobKey;
use crate::types::metadata::{BlobMetadata, BlobStatus};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("failed to serialize document: {0}")]
    FailedToSerializeDocument(String),

    #[error("metadata not found for key {0}")]
    NotFound(BlobKey),

    #[error(transparent)]
    Driver(#[from] ::mongodb::error::Error),

    #[error(transparent)]
    Bson(#[from] ::mongodb::bson::ser::Error),
}

/// Trait defining metadata-store operations. The store is keyed by
/// `(blob_hash, metadata_hash)` and indexed by status and by batch
/// coordinate; all status mutations of the system go through it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Inserts a fresh metadata row. The caller has already written the
    /// object bytes, so an existing row always implies an existing object.
    async fn queue_new_blob_metadata(&self, metadata: BlobMetadata) -> Result<(), DatabaseError>;

    async fn get_blob_metadata(&self, key: &BlobKey) -> Result<Option<BlobMetadata>, DatabaseError>;

    /// Full scan by status; used by the batcher (`Processing`) and the
    /// finalizer (`Confirmed`).
    async fn get_blob_metadata_by_status(&self, status: BlobStatus) -> Result<Vec<BlobMetadata>, DatabaseError>;

    async fn get_blob_metadata_in_batch(
        &self,
        batch_header_hash: B256,
        blob_index: u32,
    ) -> Result<Option<BlobMetadata>, DatabaseError>;

    async fn get_all_blob_metadata_by_batch(
        &self,
        batch_header_hash: B256,
    ) -> Result<Vec<BlobMetadata>, DatabaseError>;

    /// Replaces the row for `key` wholesale.
    async fn update_blob_metadata(&self, key: &BlobKey, metadata: &BlobMetadata) -> Result<(), DatabaseError>;

    async fn set_blob_status(&self, key: &BlobKey, status: BlobStatus) -> Result<(), DatabaseError>;

    async fn increment_num_retries(&self, key: &BlobKey) -> Result<(), DatabaseError>;

    async fn remove_blob_metadata(&self, key: &BlobKey) -> Result<(), DatabaseError>;
}
