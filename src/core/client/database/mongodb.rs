use alloy::primitives::B256;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{bson, Client, Collection, Database};
use serde::Serialize;
use tracing::debug;

use crate::core::client::database::{DatabaseClient, DatabaseError};
use crate::types::key::BlobKey;
use crate::types::metadata::{BlobMetadata, BlobStatus};
use crate::types::params::DatabaseParams;

const BLOB_METADATA_COLLECTION: &str = "blob_metadata";

fn to_document<T: Serialize>(value: &T) -> Result<Document, DatabaseError> {
    let bson = bson::to_bson(value)?;
    match bson {
        Bson::Document(doc) => Ok(doc),
        other => Err(DatabaseError::FailedToSerializeDocument(format!("expected a document, got {other}"))),
    }
}

/// MongoDB-backed metadata store. One collection holds every blob metadata
/// row; the batch queries filter on fields of the embedded confirmation info.
pub struct MongoDbClient {
    database: Database,
}

impl MongoDbClient {
    pub async fn new(params: &DatabaseParams) -> Result<Self, DatabaseError> {
        let client = Client::with_uri_str(&params.connection_uri)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let database = client.database(&params.database_name);
        Ok(Self { database })
    }

    fn collection(&self) -> Collection<BlobMetadata> {
        self.database.collection(BLOB_METADATA_COLLECTION)
    }

    fn key_filter(key: &BlobKey) -> Document {
        doc! { "blob_hash": &key.blob_hash, "metadata_hash": &key.metadata_hash }
    }
}

#[async_trait]
impl DatabaseClient for MongoDbClient {
    async fn queue_new_blob_metadata(&self, metadata: BlobMetadata) -> Result<(), DatabaseError> {
        debug!(key = %metadata.blob_key(), "queueing new blob metadata");
        self.collection().insert_one(metadata, None).await?;
        Ok(())
    }

    async fn get_blob_metadata(&self, key: &BlobKey) -> Result<Option<BlobMetadata>, DatabaseError> {
        Ok(self.collection().find_one(Self::key_filter(key), None).await?)
    }

    async fn get_blob_metadata_by_status(&self, status: BlobStatus) -> Result<Vec<BlobMetadata>, DatabaseError> {
        let filter = doc! { "blob_status": bson::to_bson(&status)? };
        let cursor = self.collection().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_blob_metadata_in_batch(
        &self,
        batch_header_hash: B256,
        blob_index: u32,
    ) -> Result<Option<BlobMetadata>, DatabaseError> {
        let filter = doc! {
            "confirmation_info.batch_header_hash": batch_header_hash.to_string(),
            "confirmation_info.blob_index": blob_index,
        };
        Ok(self.collection().find_one(filter, None).await?)
    }

    async fn get_all_blob_metadata_by_batch(
        &self,
        batch_header_hash: B256,
    ) -> Result<Vec<BlobMetadata>, DatabaseError> {
        let filter = doc! { "confirmation_info.batch_header_hash": batch_header_hash.to_string() };
        let cursor = self.collection().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_blob_metadata(&self, key: &BlobKey, metadata: &BlobMetadata) -> Result<(), DatabaseError> {
        let result = self
            .collection()
            .replace_one(Self::key_filter(key), metadata, None)
            .await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn set_blob_status(&self, key: &BlobKey, status: BlobStatus) -> Result<(), DatabaseError> {
        let update = doc! { "$set": { "blob_status": bson::to_bson(&status)? } };
        let result = self.collection().update_one(Self::key_filter(key), update, None).await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn increment_num_retries(&self, key: &BlobKey) -> Result<(), DatabaseError> {
        let update = doc! { "$inc": { "num_retries": 1 } };
        let result = self.collection().update_one(Self::key_filter(key), update, None).await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn remove_blob_metadata(&self, key: &BlobKey) -> Result<(), DatabaseError> {
        self.collection().delete_one(Self::key_filter(key), None).await?;
        Ok(())
    }
}
