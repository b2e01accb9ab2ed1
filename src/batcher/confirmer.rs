use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batcher::build_confirmation_info;
use crate::blobstore::SharedBlobStore;
use crate::core::client::chain::ChainClient;
use crate::core::client::storage_node::StorageNodeClient;
use crate::types::batch::Batch;
use crate::utils::metrics::DISPERSER_METRICS;

/// Consumes assembled batches and drives each through on-chain confirmation.
/// Up to `confirmer_num` batches are in flight at once; batches are
/// independent, and blob indices within a batch stay as packed.
pub struct Confirmer {
    blob_store: Arc<SharedBlobStore>,
    chain: Arc<dyn ChainClient>,
    storage_node: Arc<dyn StorageNodeClient>,
    confirmer_num: usize,
    max_num_retries_per_blob: u32,
}

impl Confirmer {
    pub fn new(
        blob_store: Arc<SharedBlobStore>,
        chain: Arc<dyn ChainClient>,
        storage_node: Arc<dyn StorageNodeClient>,
        confirmer_num: usize,
        max_num_retries_per_blob: u32,
    ) -> Self {
        Self { blob_store, chain, storage_node, confirmer_num: confirmer_num.max(1), max_num_retries_per_blob }
    }

    pub fn run(
        self: Arc<Self>,
        mut batches: mpsc::Receiver<Batch>,
        cancellation_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let permits = Arc::new(Semaphore::new(self.confirmer_num));
            loop {
                let batch = tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    batch = batches.recv() => match batch {
                        Some(batch) => batch,
                        None => break,
                    },
                };

                let permit = permits.clone().acquire_owned().await.expect("confirmer semaphore closed");
                let confirmer = self.clone();
                tokio::spawn(async move {
                    confirmer.process_batch(batch).await;
                    drop(permit);
                });
            }
            info!("confirmer shutting down");
        })
    }

    /// Submits one batch and commits the outcome to metadata. A chain
    /// failure drops the whole batch: every blob takes a retry, none is
    /// partially confirmed.
    async fn process_batch(&self, batch: Batch) {
        let batch_header_hash = batch.header.batch_header_hash();
        info!(%batch_header_hash, blobs = batch.blobs.len(), "confirming batch");

        let blob_headers: Vec<_> = batch.blobs.iter().map(|b| b.blob_header.clone()).collect();
        let confirmation = match self.chain.confirm_batch(&batch.header, &blob_headers).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                warn!(%batch_header_hash, error = %e, "batch confirmation failed");
                DISPERSER_METRICS.batches_failed.add(1, &[]);
                for blob in &batch.blobs {
                    if let Err(e) =
                        self.blob_store.handle_blob_failure(&blob.metadata, self.max_num_retries_per_blob).await
                    {
                        warn!(key = %blob.metadata.blob_key(), error = %e, "failed to record blob failure");
                    }
                }
                return;
            }
        };

        info!(
            %batch_header_hash,
            batch_id = confirmation.batch_id,
            block = confirmation.confirmation_block_number,
            "batch confirmed on chain"
        );
        DISPERSER_METRICS.batches_confirmed.add(1, &[]);

        for (index, blob) in batch.blobs.iter().enumerate() {
            let info = match build_confirmation_info(
                &batch.header,
                index as u32,
                blob,
                &batch.merkle_tree,
                Some(&confirmation),
            ) {
                Ok(info) => info,
                Err(e) => {
                    warn!(key = %blob.metadata.blob_key(), error = %e, "failed to build confirmation info");
                    continue;
                }
            };

            let confirmed = match self.blob_store.mark_blob_confirmed(&blob.metadata, info).await {
                Ok(confirmed) => confirmed,
                Err(e) => {
                    warn!(key = %blob.metadata.blob_key(), error = %e, "failed to mark blob confirmed");
                    continue;
                }
            };

            // Refresh the KV record with the chain-assigned fields so the
            // status fallback serves the confirmed proof.
            match confirmed.serialize() {
                Ok(value) => {
                    if let Err(e) = self
                        .storage_node
                        .put_kv_entry(confirmed.blob_key().to_string().as_bytes(), &value)
                        .await
                    {
                        warn!(key = %confirmed.blob_key(), error = %e, "failed to refresh kv record");
                    }
                }
                Err(e) => warn!(key = %confirmed.blob_key(), error = %e, "failed to serialize confirmed record"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::chain::{BatchConfirmation, ChainError, MockChainClient};
    use crate::core::client::database::MockDatabaseClient;
    use crate::core::client::storage::MockStorageClient;
    use crate::core::client::storage_node::MockStorageNodeClient;
    use crate::core::serialization::set_batch_root;
    use crate::types::batch::{BatchHeader, BlobHeader, EncodedBlob};
    use crate::types::metadata::{BlobMetadata, BlobStatus};
    use alloy::primitives::B256;
    use bytes::Bytes;
    use std::time::Duration;

    fn test_batch(blob_count: u8) -> Batch {
        let blobs: Vec<EncodedBlob> = (0..blob_count)
            .map(|i| EncodedBlob {
                metadata: BlobMetadata {
                    blob_hash: format!("{i:064x}"),
                    metadata_hash: format!("{i:02x}"),
                    blob_status: BlobStatus::Processing,
                    ..Default::default()
                },
                blob_header: BlobHeader {
                    commitment_root: vec![i + 1; 32],
                    data_length: 128,
                    blob_quorum_infos: vec![],
                },
                chunks: Bytes::from_static(b"chunks"),
                rows: 8,
                cols: 4,
            })
            .collect();

        let headers: Vec<BlobHeader> = blobs.iter().map(|b| b.blob_header.clone()).collect();
        let mut header = BatchHeader::default();
        let merkle_tree = set_batch_root(&mut header, &headers).unwrap();
        Batch { header, blobs, merkle_tree }
    }

    fn confirmer(
        database: MockDatabaseClient,
        chain: MockChainClient,
        storage_node: MockStorageNodeClient,
    ) -> Confirmer {
        let blob_store = Arc::new(SharedBlobStore::new(
            Arc::new(MockStorageClient::new()),
            Arc::new(database),
            false,
            Duration::ZERO,
        ));
        Confirmer::new(blob_store, Arc::new(chain), Arc::new(storage_node), 1, 2)
    }

    #[tokio::test]
    async fn confirmed_batch_marks_every_blob_with_stable_indices() {
        let batch = test_batch(2);

        let mut chain = MockChainClient::new();
        chain.expect_confirm_batch().times(1).returning(|_, _| {
            Ok(BatchConfirmation {
                batch_id: 9,
                confirmation_block_number: 1234,
                fee: vec![0x01],
                signatory_record_hash: B256::repeat_byte(0x77),
            })
        });

        let mut database = MockDatabaseClient::new();
        database
            .expect_update_blob_metadata()
            .withf(|key, updated| {
                let info = updated.confirmation_info.as_ref().unwrap();
                updated.blob_status == BlobStatus::Confirmed
                    && info.batch_id == 9
                    && info.confirmation_block_number == 1234
                    && info.blob_index == u32::from_str_radix(&key.metadata_hash, 16).unwrap()
            })
            .times(2)
            .returning(|_, _| Ok(()));

        let mut storage_node = MockStorageNodeClient::new();
        storage_node
            .expect_put_kv_entry()
            .withf(|_, value| {
                let record = BlobMetadata::deserialize(value).unwrap();
                record.blob_status == BlobStatus::Confirmed
            })
            .times(2)
            .returning(|_, _| Ok(()));

        confirmer(database, chain, storage_node).process_batch(batch).await;
    }

    #[tokio::test]
    async fn chain_failure_drops_the_batch_and_counts_retries() {
        let batch = test_batch(2);

        let mut chain = MockChainClient::new();
        chain
            .expect_confirm_batch()
            .times(1)
            .returning(|_, _| Err(ChainError::Submission("nonce too low".to_string())));

        let mut database = MockDatabaseClient::new();
        database.expect_update_blob_metadata().times(0);
        database.expect_increment_num_retries().times(2).returning(|_| Ok(()));

        let mut storage_node = MockStorageNodeClient::new();
        storage_node.expect_put_kv_entry().times(0);

        confirmer(database, chain, storage_node).process_batch(batch).await;
    }

    #[tokio::test]
    async fn exhausted_retries_terminally_fail_the_blobs() {
        let mut batch = test_batch(1);
        batch.blobs[0].metadata.num_retries = 2;

        let mut chain = MockChainClient::new();
        chain
            .expect_confirm_batch()
            .returning(|_, _| Err(ChainError::Reverted(B256::ZERO)));

        let mut database = MockDatabaseClient::new();
        database.expect_increment_num_retries().times(0);
        database
            .expect_set_blob_status()
            .withf(|_, status| *status == BlobStatus::Failed)
            .times(1)
            .returning(|_, _| Ok(()));

        confirmer(database, chain, MockStorageNodeClient::new()).process_batch(batch).await;
    }
}
