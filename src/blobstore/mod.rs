//! The shared blob store the disperser operates on: object bytes in the
//! object store, metadata rows in the metadata store.
//!
//! Blobs are identified by their [`BlobKey`]. The same blob bytes at
//! different requests are processed as different blobs, distinguished by the
//! request timestamp folded into the metadata hash; the object bytes are
//! shared when keyed by blob hash. All status transitions in the system go
//! through the `mark_*` operations here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::core::client::database::DatabaseClient;
use crate::core::client::storage::StorageClient;
use crate::core::error::{DisperserError, DisperserResult};
use crate::types::blob::{Blob, SecurityParam};
use crate::types::key::BlobKey;
use crate::types::metadata::{BlobMetadata, BlobStatus, ConfirmationInfo, RequestMetadata};

const MAX_BLOB_FETCH_WORKERS: usize = 64;

pub struct SharedBlobStore {
    storage: Arc<dyn StorageClient>,
    database: Arc<dyn DatabaseClient>,
    metadata_hash_as_blob_key: bool,
    /// Lifetime of metadata rows. Zero disables expiry.
    ttl: Duration,
}

impl SharedBlobStore {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        database: Arc<dyn DatabaseClient>,
        metadata_hash_as_blob_key: bool,
        ttl: Duration,
    ) -> Self {
        Self { storage, database, metadata_hash_as_blob_key, ttl }
    }

    pub fn metadata_hash_as_blob_key(&self) -> bool {
        self.metadata_hash_as_blob_key
    }

    fn object_key(&self, key: &BlobKey) -> String {
        if self.metadata_hash_as_blob_key {
            key.metadata_hash.clone()
        } else {
            blob_object_key(&key.blob_hash)
        }
    }

    fn expiry_from_now(&self) -> u64 {
        if self.ttl.is_zero() {
            return 0;
        }
        (Utc::now() + self.ttl).timestamp() as u64
    }

    /// Stores the blob bytes and queues a `Processing` metadata row. The
    /// object write precedes the metadata write so that an existing row
    /// always implies an existing object.
    pub async fn store_blob(&self, blob: &Blob, requested_at: u64) -> DisperserResult<BlobKey> {
        let key = BlobKey::new(
            blob_content_hash(&blob.data),
            metadata_hash(requested_at, &blob.request_header.security_params),
        );

        self.storage.put_data(blob.data.clone(), &self.object_key(&key)).await.map_err(|e| {
            error!(key = %key, error = %e, "error uploading blob");
            e
        })?;

        let metadata = BlobMetadata {
            blob_hash: key.blob_hash.clone(),
            metadata_hash: key.metadata_hash.clone(),
            blob_status: BlobStatus::Processing,
            num_retries: 0,
            expiry: self.expiry_from_now(),
            request_metadata: RequestMetadata {
                blob_request_header: blob.request_header.clone(),
                blob_size: blob.data.len() as u64,
                requested_at,
            },
            confirmation_info: None,
        };
        self.database.queue_new_blob_metadata(metadata).await.map_err(|e| {
            error!(key = %key, error = %e, "error queueing blob metadata");
            e
        })?;

        Ok(key)
    }

    pub async fn get_blob_content(&self, metadata: &BlobMetadata) -> DisperserResult<Bytes> {
        Ok(self.storage.get_data(&self.object_key(&metadata.blob_key())).await?)
    }

    pub async fn get_blob_metadata(&self, key: &BlobKey) -> DisperserResult<Option<BlobMetadata>> {
        Ok(self.database.get_blob_metadata(key).await?)
    }

    pub async fn get_blob_metadata_by_status(&self, status: BlobStatus) -> DisperserResult<Vec<BlobMetadata>> {
        Ok(self.database.get_blob_metadata_by_status(status).await?)
    }

    pub async fn get_metadata_in_batch(
        &self,
        batch_header_hash: alloy::primitives::B256,
        blob_index: u32,
    ) -> DisperserResult<Option<BlobMetadata>> {
        Ok(self.database.get_blob_metadata_in_batch(batch_header_hash, blob_index).await?)
    }

    pub async fn get_all_blob_metadata_by_batch(
        &self,
        batch_header_hash: alloy::primitives::B256,
    ) -> DisperserResult<Vec<BlobMetadata>> {
        Ok(self.database.get_all_blob_metadata_by_batch(batch_header_hash).await?)
    }

    /// Fetches the blob bytes behind each metadata row, at most
    /// `MAX_BLOB_FETCH_WORKERS` fetches in flight. The first failed fetch
    /// aborts the whole call.
    pub async fn get_blobs_by_metadata(
        &self,
        metadata: &[BlobMetadata],
    ) -> DisperserResult<HashMap<BlobKey, Blob>> {
        let blobs: HashMap<BlobKey, Blob> = stream::iter(metadata.iter().map(|m| {
            let key = m.blob_key();
            let header = m.request_metadata.blob_request_header.clone();
            async move {
                let data = self.storage.get_data(&self.object_key(&key)).await?;
                Ok::<_, DisperserError>((key, Blob { request_header: header, data }))
            }
        }))
        .buffer_unordered(MAX_BLOB_FETCH_WORKERS)
        .try_collect()
        .await?;

        Ok(blobs)
    }

    /// Attaches the confirmation record and moves the blob to `Confirmed`,
    /// extending the row's expiry when the confirmation would outlive it.
    pub async fn mark_blob_confirmed(
        &self,
        metadata: &BlobMetadata,
        confirmation_info: ConfirmationInfo,
    ) -> DisperserResult<BlobMetadata> {
        let mut updated = metadata.clone();
        let refreshed = self.expiry_from_now();
        if updated.expiry < refreshed {
            updated.expiry = refreshed;
        }
        updated.blob_status = BlobStatus::Confirmed;
        updated.confirmation_info = Some(confirmation_info);

        self.database.update_blob_metadata(&metadata.blob_key(), &updated).await?;
        Ok(updated)
    }

    pub async fn mark_blob_finalized(&self, key: &BlobKey) -> DisperserResult<()> {
        Ok(self.database.set_blob_status(key, BlobStatus::Finalized).await?)
    }

    pub async fn mark_blob_processing(&self, key: &BlobKey) -> DisperserResult<()> {
        Ok(self.database.set_blob_status(key, BlobStatus::Processing).await?)
    }

    pub async fn mark_blob_failed(&self, key: &BlobKey) -> DisperserResult<()> {
        Ok(self.database.set_blob_status(key, BlobStatus::Failed).await?)
    }

    pub async fn increment_blob_retry_count(&self, metadata: &BlobMetadata) -> DisperserResult<()> {
        Ok(self.database.increment_num_retries(&metadata.blob_key()).await?)
    }

    /// Retry-or-fail policy applied to every per-blob failure: below the cap
    /// the retry counter moves up and the blob stays `Processing`; at the cap
    /// the blob is terminally failed.
    pub async fn handle_blob_failure(&self, metadata: &BlobMetadata, max_retry: u32) -> DisperserResult<()> {
        if metadata.num_retries < max_retry {
            debug!(key = %metadata.blob_key(), retries = metadata.num_retries, "blob failed, will retry");
            self.increment_blob_retry_count(metadata).await
        } else {
            debug!(key = %metadata.blob_key(), retries = metadata.num_retries, "blob failed terminally");
            self.mark_blob_failed(&metadata.blob_key()).await
        }
    }

    /// Deletes the blob object and its metadata row.
    pub async fn remove_blob(&self, metadata: &BlobMetadata) -> DisperserResult<()> {
        self.storage.delete_data(&self.object_key(&metadata.blob_key())).await?;
        Ok(self.database.remove_blob_metadata(&metadata.blob_key()).await?)
    }
}

/// Hex sha256 of the blob content.
pub fn blob_content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Request fingerprint covering the arrival time and the quorum ids with
/// their adversary thresholds. The digest construction appends the sha256 of
/// the empty message to the printable prefix; deployed keys depend on this
/// exact byte layout, so it must not be normalized to a plain digest.
pub fn metadata_hash(requested_at: u64, security_params: &[SecurityParam]) -> String {
    let mut prefix = format!("{requested_at}/");
    for param in security_params {
        prefix.push_str(&format!("{}/{}/", param.quorum_id, param.adversary_threshold));
    }

    let mut bytes = prefix.into_bytes();
    bytes.extend_from_slice(&Sha256::digest([]));
    hex::encode(bytes)
}

fn blob_object_key(blob_hash: &str) -> String {
    format!("blob/{blob_hash}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::database::MockDatabaseClient;
    use crate::core::client::storage::{MockStorageClient, StorageError};
    use crate::types::blob::BlobRequestHeader;
    use mockall::predicate::eq;
    use rstest::rstest;

    fn security_param() -> SecurityParam {
        SecurityParam { quorum_id: 0, adversary_threshold: 25, quorum_threshold: 50 }
    }

    fn test_blob(data: &[u8]) -> Blob {
        Blob {
            request_header: BlobRequestHeader { security_params: vec![security_param()], target_row_num: 0 },
            data: Bytes::copy_from_slice(data),
        }
    }

    fn store(
        storage: MockStorageClient,
        database: MockDatabaseClient,
        metadata_hash_as_blob_key: bool,
    ) -> SharedBlobStore {
        SharedBlobStore::new(Arc::new(storage), Arc::new(database), metadata_hash_as_blob_key, Duration::ZERO)
    }

    #[test]
    fn blob_hash_is_recomputable_hex_sha256() {
        let hash = blob_content_hash(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hex::encode(Sha256::digest(b"hello")));
    }

    /// Pins the key construction byte for byte: the printable prefix followed
    /// by the sha256 of the empty message.
    #[test]
    fn metadata_hash_matches_known_vector() {
        let hash = metadata_hash(0, &[security_param()]);
        assert_eq!(
            hash,
            // hex("0/0/25/") ++ sha256("")
            "302f302f32352fe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );
    }

    #[test]
    fn metadata_hash_distinguishes_request_times_and_quorums() {
        let params = vec![security_param()];
        assert_ne!(metadata_hash(1, &params), metadata_hash(2, &params));

        let more = vec![
            security_param(),
            SecurityParam { quorum_id: 1, adversary_threshold: 30, quorum_threshold: 80 },
        ];
        assert_ne!(metadata_hash(1, &params), metadata_hash(1, &more));
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    #[tokio::test]
    async fn store_blob_writes_object_then_processing_metadata(#[case] metadata_hash_as_blob_key: bool) {
        let blob = test_blob(b"payload");
        let expected_key = BlobKey::new(
            blob_content_hash(&blob.data),
            metadata_hash(7, &blob.request_header.security_params),
        );
        let object_key = if metadata_hash_as_blob_key {
            expected_key.metadata_hash.clone()
        } else {
            format!("blob/{}.json", expected_key.blob_hash)
        };

        let mut storage = MockStorageClient::new();
        let expected_data = blob.data.clone();
        storage
            .expect_put_data()
            .withf(move |data, key| *data == expected_data && key == object_key)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut database = MockDatabaseClient::new();
        let key = expected_key.clone();
        database
            .expect_queue_new_blob_metadata()
            .withf(move |m| {
                m.blob_key() == key
                    && m.blob_status == BlobStatus::Processing
                    && m.num_retries == 0
                    && m.expiry == 0
                    && m.request_metadata.blob_size == 7
                    && m.request_metadata.requested_at == 7
            })
            .times(1)
            .returning(|_| Ok(()));

        let key = store(storage, database, metadata_hash_as_blob_key)
            .store_blob(&blob, 7)
            .await
            .unwrap();
        assert_eq!(key, expected_key);
    }

    #[tokio::test]
    async fn failed_object_write_queues_no_metadata() {
        let mut storage = MockStorageClient::new();
        storage.expect_put_data().returning(|_, _| Err(StorageError::Backend("down".to_string())));

        let mut database = MockDatabaseClient::new();
        database.expect_queue_new_blob_metadata().times(0);

        let result = store(storage, database, false).store_blob(&test_blob(b"x"), 1).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn handle_blob_failure_increments_below_cap_and_fails_at_cap() {
        let mut metadata = BlobMetadata {
            blob_hash: "aa".to_string(),
            metadata_hash: "bb".to_string(),
            ..Default::default()
        };

        let mut database = MockDatabaseClient::new();
        database.expect_increment_num_retries().times(1).returning(|_| Ok(()));
        database
            .expect_set_blob_status()
            .with(eq(metadata.blob_key()), eq(BlobStatus::Failed))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = store(MockStorageClient::new(), database, false);

        metadata.num_retries = 1;
        store.handle_blob_failure(&metadata, 2).await.unwrap();

        metadata.num_retries = 2;
        store.handle_blob_failure(&metadata, 2).await.unwrap();
    }

    #[tokio::test]
    async fn parallel_fetch_aborts_on_first_error() {
        let rows: Vec<BlobMetadata> = (0..3)
            .map(|i| BlobMetadata {
                blob_hash: format!("{i:02x}"),
                metadata_hash: format!("{i:02x}{i:02x}"),
                ..Default::default()
            })
            .collect();

        let mut storage = MockStorageClient::new();
        storage.expect_get_data().returning(|key| {
            if key.contains("01") {
                Err(StorageError::Backend("gone".to_string()))
            } else {
                Ok(Bytes::from_static(b"data"))
            }
        });

        let store = store(storage, MockDatabaseClient::new(), false);
        assert!(store.get_blobs_by_metadata(&rows).await.is_err());
    }

    #[tokio::test]
    async fn batch_lookup_and_removal_pass_through_to_the_backends() {
        let metadata = BlobMetadata {
            blob_hash: "aa".to_string(),
            metadata_hash: "bb".to_string(),
            ..Default::default()
        };
        let batch_header_hash = alloy::primitives::B256::repeat_byte(0x07);

        let mut database = MockDatabaseClient::new();
        let row = metadata.clone();
        database
            .expect_get_all_blob_metadata_by_batch()
            .with(eq(batch_header_hash))
            .times(1)
            .returning(move |_| Ok(vec![row.clone()]));
        database.expect_remove_blob_metadata().with(eq(metadata.blob_key())).times(1).returning(|_| Ok(()));

        let mut storage = MockStorageClient::new();
        storage.expect_delete_data().withf(|key| key == "blob/aa.json").times(1).returning(|_| Ok(()));

        let store = store(storage, database, false);
        let rows = store.get_all_blob_metadata_by_batch(batch_header_hash).await.unwrap();
        assert_eq!(rows.len(), 1);
        store.remove_blob(&metadata).await.unwrap();
    }

    #[tokio::test]
    async fn mark_blob_confirmed_attaches_info_and_keeps_longer_expiry() {
        let metadata = BlobMetadata {
            blob_hash: "aa".to_string(),
            metadata_hash: "bb".to_string(),
            expiry: u64::MAX,
            ..Default::default()
        };

        let mut database = MockDatabaseClient::new();
        database
            .expect_update_blob_metadata()
            .withf(|_, updated| {
                updated.blob_status == BlobStatus::Confirmed
                    && updated.confirmation_info.is_some()
                    && updated.expiry == u64::MAX
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let store = store(MockStorageClient::new(), database, false);
        let updated = store.mark_blob_confirmed(&metadata, ConfirmationInfo::default()).await.unwrap();
        assert_eq!(updated.blob_status, BlobStatus::Confirmed);
    }
}
