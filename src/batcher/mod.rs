//! The batching pipeline: every pull interval, gather `Processing` blobs,
//! erasure-encode them through the remote encoder, commit the batch to the
//! storage cluster, and hand it to the confirmer for on-chain submission.

pub mod confirmer;
pub mod encoding;
pub mod finalizer;

use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::blobstore::SharedBlobStore;
use crate::cli::BatcherRunCmd;
use crate::core::client::chain::BatchConfirmation;
use crate::core::client::storage_node::StorageNodeClient;
use crate::core::config::BatcherConfig;
use crate::core::error::{DisperserError, DisperserResult};
use crate::core::serialization::{set_batch_root, commitment_root, MerkleTree};
use crate::types::batch::{Batch, BatchHeader, BlobHeader, EncodedBlob};
use crate::types::metadata::{BlobMetadata, BlobQuorumInfo, BlobStatus, ConfirmationInfo, QuorumResult};
use crate::types::params::BatcherParams;
use crate::utils::metrics::{init_metrics, serve_metrics, DISPERSER_METRICS};
use confirmer::Confirmer;
use encoding::EncodingPool;
use finalizer::Finalizer;

pub struct Batcher {
    blob_store: Arc<SharedBlobStore>,
    storage_node: Arc<dyn StorageNodeClient>,
    encoding_pool: EncodingPool,
    batches: mpsc::Sender<Batch>,
    params: BatcherParams,
}

impl Batcher {
    pub fn new(
        blob_store: Arc<SharedBlobStore>,
        storage_node: Arc<dyn StorageNodeClient>,
        encoding_pool: EncodingPool,
        batches: mpsc::Sender<Batch>,
        params: BatcherParams,
    ) -> Self {
        Self { blob_store, storage_node, encoding_pool, batches, params }
    }

    /// Pull loop. Each iteration is synchronous from pull through hand-off;
    /// a full confirmer queue or a full encoding queue stretches the
    /// effective interval instead of dropping work.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.params.pull_interval);
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("batcher shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.handle_single_batch().await {
                        warn!(error = %e, "batch iteration failed");
                    }
                }
            }
        }
    }

    /// One pull: pack, encode, upload, hand off. Pulls are idempotent over
    /// `Processing` metadata; anything not packed or failed here is picked
    /// up again next interval.
    pub async fn handle_single_batch(&self) -> DisperserResult<()> {
        let started = Instant::now();

        let processing = self.blob_store.get_blob_metadata_by_status(BlobStatus::Processing).await?;
        if processing.is_empty() {
            return Ok(());
        }

        let batch_metadata = pack_batch(processing, self.params.batch_size_limit_mib * 1024 * 1024);
        if batch_metadata.is_empty() {
            return Ok(());
        }
        debug!(blobs = batch_metadata.len(), "packed batch from processing blobs");

        let blobs = match self.blob_store.get_blobs_by_metadata(&batch_metadata).await {
            Ok(blobs) => blobs,
            Err(e) => {
                warn!(error = %e, "failed to fetch blob contents, counting a retry for the whole pull");
                self.fail_blobs(batch_metadata.iter()).await;
                return Ok(());
            }
        };

        // Encode fan-out. Submission order fixes the blob indices.
        let mut pending = Vec::with_capacity(batch_metadata.len());
        for metadata in batch_metadata {
            let Some(blob) = blobs.get(&metadata.blob_key()) else {
                self.fail_blobs(std::iter::once(&metadata)).await;
                continue;
            };
            let target_row_num = metadata.request_metadata.blob_request_header.target_row_num;
            let cols = if target_row_num > 0 { target_row_num } else { self.params.target_num_chunks };
            let reply = self.encoding_pool.submit(blob.data.clone(), cols).await?;
            pending.push((metadata, reply));
        }

        let mut encoded_blobs = Vec::with_capacity(pending.len());
        for (metadata, reply) in pending {
            let result = match reply.await {
                Ok(result) => result,
                Err(_) => Err(crate::core::client::encoder::EncoderError::Rpc("encode task dropped".to_string())),
            };
            match result {
                Ok(output) => {
                    let blob_header = BlobHeader {
                        commitment_root: commitment_root(std::slice::from_ref(&output.commitment))?.to_vec(),
                        data_length: output.chunks.len() as u64,
                        blob_quorum_infos: metadata
                            .request_metadata
                            .blob_request_header
                            .security_params
                            .iter()
                            .map(|param| BlobQuorumInfo { security_param: *param, chunk_length: output.rows })
                            .collect(),
                    };
                    encoded_blobs.push(EncodedBlob {
                        metadata,
                        blob_header,
                        chunks: output.chunks,
                        rows: output.rows,
                        cols: output.cols,
                    });
                }
                Err(e) => {
                    warn!(key = %metadata.blob_key(), error = %e, "encoding failed");
                    DISPERSER_METRICS.encoding_failures.add(1, &[]);
                    self.fail_blobs(std::iter::once(&metadata)).await;
                }
            }
        }

        if encoded_blobs.is_empty() {
            warn!("no blobs survived encoding, aborting batch");
            return Ok(());
        }

        let blob_headers: Vec<BlobHeader> = encoded_blobs.iter().map(|b| b.blob_header.clone()).collect();
        let mut header = BatchHeader::default();
        let merkle_tree = set_batch_root(&mut header, &blob_headers)?;

        let mut payload = BytesMut::new();
        for blob in &encoded_blobs {
            payload.extend_from_slice(&blob.chunks);
        }
        if let Err(e) = self.storage_node.upload_encoded_batch(payload.freeze()).await {
            warn!(error = %e, "storage cluster upload failed, dropping batch");
            DISPERSER_METRICS.batches_failed.add(1, &[]);
            self.fail_blobs(encoded_blobs.iter().map(|b| &b.metadata)).await;
            return Err(e.into());
        }

        // Publish one KV record per blob. The record outlives a failed chain
        // confirmation; the status API's fallback path reads it.
        if let Err(e) = self.publish_kv_records(&header, &encoded_blobs, &merkle_tree).await {
            warn!(error = %e, "kv publish failed, dropping batch");
            DISPERSER_METRICS.batches_failed.add(1, &[]);
            self.fail_blobs(encoded_blobs.iter().map(|b| &b.metadata)).await;
            return Err(e);
        }

        DISPERSER_METRICS.blobs_batched.add(encoded_blobs.len() as u64, &[]);
        info!(blobs = encoded_blobs.len(), batch_root = %header.batch_root, "batch assembled");

        self.batches
            .send(Batch { header, blobs: encoded_blobs, merkle_tree })
            .await
            .map_err(|_| DisperserError::Internal("confirmer is shut down".to_string()))?;

        DISPERSER_METRICS.batch_latency.record(started.elapsed().as_secs_f64() * 1000.0, &[]);
        Ok(())
    }

    async fn publish_kv_records(
        &self,
        header: &BatchHeader,
        encoded_blobs: &[EncodedBlob],
        merkle_tree: &MerkleTree,
    ) -> DisperserResult<()> {
        for (index, blob) in encoded_blobs.iter().enumerate() {
            let mut record = blob.metadata.clone();
            record.confirmation_info =
                Some(build_confirmation_info(header, index as u32, blob, merkle_tree, None)?);
            let value = record.serialize()?;
            self.storage_node.put_kv_entry(record.blob_key().to_string().as_bytes(), &value).await?;
        }
        Ok(())
    }

    async fn fail_blobs<'a>(&self, blobs: impl Iterator<Item = &'a BlobMetadata>) {
        for metadata in blobs {
            if let Err(e) = self.blob_store.handle_blob_failure(metadata, self.params.max_num_retries_per_blob).await
            {
                warn!(key = %metadata.blob_key(), error = %e, "failed to record blob failure");
            }
        }
    }
}

/// Deterministic packing: the longest prefix of the pull, in insertion
/// order, whose cumulative raw size stays within the limit. Overflow defers
/// to the next pull.
fn pack_batch(processing: Vec<BlobMetadata>, limit_bytes: usize) -> Vec<BlobMetadata> {
    let mut packed = Vec::new();
    let mut total = 0usize;
    for metadata in processing {
        let size = metadata.request_metadata.blob_size as usize;
        if total + size > limit_bytes {
            break;
        }
        total += size;
        packed.push(metadata);
    }
    packed
}

/// Confirmation record for one blob of a batch. The batch coordinates are
/// known at assembly time; the chain-assigned fields come from the receipt
/// and stay zeroed in the pre-confirmation KV record.
pub(crate) fn build_confirmation_info(
    header: &BatchHeader,
    blob_index: u32,
    blob: &EncodedBlob,
    merkle_tree: &MerkleTree,
    chain_confirmation: Option<&BatchConfirmation>,
) -> DisperserResult<ConfirmationInfo> {
    let quorum_results = blob
        .blob_header
        .blob_quorum_infos
        .iter()
        .map(|info| (info.security_param.quorum_id, QuorumResult { percent_signed: 100 }))
        .collect();

    let mut info = ConfirmationInfo {
        batch_id: 0,
        blob_index,
        batch_root: header.batch_root,
        reference_block_number: header.reference_block_number,
        batch_header_hash: header.batch_header_hash(),
        signatory_record_hash: Default::default(),
        fee: Vec::new(),
        confirmation_block_number: 0,
        blob_inclusion_proof: merkle_tree.proof(blob_index as usize)?,
        commitment_root: blob.blob_header.commitment_root.clone(),
        length: blob.blob_header.data_length,
        blob_quorum_infos: blob.blob_header.blob_quorum_infos.clone(),
        quorum_results,
    };

    if let Some(confirmation) = chain_confirmation {
        info.batch_id = confirmation.batch_id;
        info.confirmation_block_number = confirmation.confirmation_block_number;
        info.fee = confirmation.fee.clone();
        info.signatory_record_hash = confirmation.signatory_record_hash;
    }

    Ok(info)
}

/// Runs the batching, confirmation and finalization pipeline until
/// interrupted.
pub async fn run_batcher(cmd: &BatcherRunCmd) -> DisperserResult<()> {
    let config = BatcherConfig::from_run_cmd(cmd).await?;
    let params = config.params().clone();
    let cancellation_token = CancellationToken::new();

    if config.metrics().enable_metrics {
        let registry = init_metrics()?;
        serve_metrics(registry, config.metrics().metrics_port, cancellation_token.clone());
    }

    let (batch_sender, batch_receiver) = mpsc::channel(params.confirmer_num);

    let confirmer = Arc::new(Confirmer::new(
        config.blob_store(),
        config.chain(),
        config.storage_node(),
        params.confirmer_num,
        params.max_num_retries_per_blob,
    ));
    let confirmer_handle = confirmer.run(batch_receiver, cancellation_token.clone());

    let finalizer = Finalizer::new(config.blob_store(), config.chain(), params.finalizer_interval);
    let finalizer_handle = tokio::spawn({
        let token = cancellation_token.clone();
        async move { finalizer.run(token).await }
    });

    let encoding_pool = EncodingPool::new(config.encoder(), params.encoding_request_queue_size);
    let batcher = Batcher::new(
        config.blob_store(),
        config.storage_node(),
        encoding_pool,
        batch_sender,
        params,
    );

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_token.cancel();
        }
    });

    batcher.run(cancellation_token).await;

    let _ = confirmer_handle.await;
    let _ = finalizer_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::database::MockDatabaseClient;
    use crate::core::client::encoder::{EncodedOutput, EncoderError, MockEncoderClient};
    use crate::core::client::storage::MockStorageClient;
    use crate::core::client::storage_node::MockStorageNodeClient;
    use crate::core::serialization::verify_proof;
    use crate::types::blob::{BlobRequestHeader, SecurityParam};
    use crate::types::metadata::RequestMetadata;
    use crate::types::params::BatcherParams;
    use alloy::primitives::keccak256;
    use bytes::Bytes;
    use std::time::Duration;

    fn metadata(id: u8, size: u64) -> BlobMetadata {
        BlobMetadata {
            blob_hash: format!("{id:064x}"),
            metadata_hash: format!("{id:02x}"),
            blob_status: BlobStatus::Processing,
            request_metadata: RequestMetadata {
                blob_request_header: BlobRequestHeader {
                    security_params: vec![SecurityParam {
                        quorum_id: 0,
                        adversary_threshold: 25,
                        quorum_threshold: 50,
                    }],
                    target_row_num: 0,
                },
                blob_size: size,
                requested_at: id as u64,
            },
            ..Default::default()
        }
    }

    fn params() -> BatcherParams {
        BatcherParams {
            pull_interval: Duration::from_secs(60),
            batch_size_limit_mib: 1,
            encoding_request_queue_size: 16,
            max_num_retries_per_blob: 2,
            confirmer_num: 1,
            target_num_chunks: 0,
            finalizer_interval: Duration::from_secs(360),
            metadata_hash_as_blob_key: false,
        }
    }

    fn batcher(
        database: MockDatabaseClient,
        storage: MockStorageClient,
        storage_node: MockStorageNodeClient,
        encoder: MockEncoderClient,
    ) -> (Batcher, mpsc::Receiver<Batch>) {
        let blob_store = Arc::new(SharedBlobStore::new(
            Arc::new(storage),
            Arc::new(database),
            false,
            Duration::ZERO,
        ));
        let (sender, receiver) = mpsc::channel(4);
        let pool = EncodingPool::new(Arc::new(encoder), 16);
        (Batcher::new(blob_store, Arc::new(storage_node), pool, sender, params()), receiver)
    }

    #[test]
    fn packing_takes_the_longest_fitting_prefix() {
        let pull = vec![metadata(1, 400), metadata(2, 500), metadata(3, 200)];

        let packed = pack_batch(pull.clone(), 1000);
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].metadata_hash, "01");
        assert_eq!(packed[1].metadata_hash, "02");

        assert_eq!(pack_batch(pull.clone(), 2000).len(), 3);
        assert!(pack_batch(pull, 100).is_empty());
    }

    #[tokio::test]
    async fn empty_pull_is_a_no_op() {
        let mut database = MockDatabaseClient::new();
        database.expect_get_blob_metadata_by_status().returning(|_| Ok(vec![]));
        let (batcher, mut receiver) =
            batcher(database, MockStorageClient::new(), MockStorageNodeClient::new(), MockEncoderClient::new());

        batcher.handle_single_batch().await.unwrap();
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn happy_path_assembles_and_hands_off_one_batch() {
        let row = metadata(1, 4);

        let mut database = MockDatabaseClient::new();
        let pull = vec![row.clone()];
        database.expect_get_blob_metadata_by_status().returning(move |_| Ok(pull.clone()));

        let mut storage = MockStorageClient::new();
        storage.expect_get_data().returning(|_| Ok(Bytes::from_static(b"blob")));

        let commitment = vec![0x42; 48];
        let mut encoder = MockEncoderClient::new();
        let c = commitment.clone();
        encoder.expect_encode_blob().returning(move |_, _| {
            Ok(EncodedOutput { rows: 8, cols: 4, commitment: c.clone(), chunks: Bytes::from_static(b"chunks") })
        });

        let mut storage_node = MockStorageNodeClient::new();
        storage_node
            .expect_upload_encoded_batch()
            .withf(|payload| payload.as_ref() == b"chunks".as_slice())
            .times(1)
            .returning(|_| Ok(()));
        let expected_key = row.blob_key().to_string();
        storage_node
            .expect_put_kv_entry()
            .withf(move |key, value| {
                let record = BlobMetadata::deserialize(value).unwrap();
                key == expected_key.as_bytes()
                    && record.blob_status == BlobStatus::Processing
                    && record.confirmation_info.as_ref().unwrap().blob_index == 0
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let (batcher, mut receiver) = batcher(database, storage, storage_node, encoder);
        batcher.handle_single_batch().await.unwrap();

        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch.blobs.len(), 1);
        // A single-leaf tree: root = keccak(blob header) = keccak(keccak(commitment)).
        let expected_root = keccak256(keccak256(&commitment));
        assert_eq!(batch.header.batch_root, expected_root);

        let proof = batch.merkle_tree.proof(0).unwrap();
        let leaf = batch.blobs[0].blob_header.blob_header_hash().unwrap();
        assert!(verify_proof(leaf, &proof, batch.header.batch_root, 0));
    }

    #[tokio::test]
    async fn encoding_failure_counts_a_retry_and_spares_siblings() {
        let rows = vec![metadata(1, 4), metadata(2, 4)];

        let mut database = MockDatabaseClient::new();
        let pull = rows.clone();
        database.expect_get_blob_metadata_by_status().returning(move |_| Ok(pull.clone()));
        database
            .expect_increment_num_retries()
            .withf(move |key| key.blob_hash == format!("{:064x}", 1))
            .times(1)
            .returning(|_| Ok(()));

        let mut storage = MockStorageClient::new();
        storage.expect_get_data().returning(|key| {
            Ok(if key.contains(&format!("{:064x}", 1)) {
                Bytes::from_static(b"bad")
            } else {
                Bytes::from_static(b"good")
            })
        });

        let mut encoder = MockEncoderClient::new();
        encoder.expect_encode_blob().returning(|data, _| {
            if data.as_ref() == b"bad" {
                Err(EncoderError::Rpc("transient".to_string()))
            } else {
                Ok(EncodedOutput {
                    rows: 8,
                    cols: 4,
                    commitment: vec![0x11; 48],
                    chunks: Bytes::from_static(b"chunks"),
                })
            }
        });

        let mut storage_node = MockStorageNodeClient::new();
        storage_node.expect_upload_encoded_batch().returning(|_| Ok(()));
        storage_node.expect_put_kv_entry().returning(|_, _| Ok(()));

        let (batcher, mut receiver) = batcher(database, storage, storage_node, encoder);
        batcher.handle_single_batch().await.unwrap();

        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch.blobs.len(), 1);
        assert_eq!(batch.blobs[0].metadata.blob_hash, format!("{:064x}", 2));
    }

    #[tokio::test]
    async fn storage_upload_failure_drops_the_batch_and_counts_retries() {
        let row = metadata(1, 4);

        let mut database = MockDatabaseClient::new();
        let pull = vec![row.clone()];
        database.expect_get_blob_metadata_by_status().returning(move |_| Ok(pull.clone()));
        database.expect_increment_num_retries().times(1).returning(|_| Ok(()));

        let mut storage = MockStorageClient::new();
        storage.expect_get_data().returning(|_| Ok(Bytes::from_static(b"blob")));

        let mut encoder = MockEncoderClient::new();
        encoder.expect_encode_blob().returning(|_, _| {
            Ok(EncodedOutput { rows: 8, cols: 4, commitment: vec![0x11; 48], chunks: Bytes::from_static(b"chunks") })
        });

        let mut storage_node = MockStorageNodeClient::new();
        storage_node.expect_upload_encoded_batch().returning(|_| {
            Err(crate::core::client::storage_node::StorageNodeError::Http("down".to_string()))
        });
        storage_node.expect_put_kv_entry().times(0);

        let (batcher, mut receiver) = batcher(database, storage, storage_node, encoder);
        assert!(batcher.handle_single_batch().await.is_err());
        assert!(receiver.try_recv().is_err());
    }
}
