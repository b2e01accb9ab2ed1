use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::blobstore::SharedBlobStore;
use crate::core::client::chain::ChainClient;
use crate::core::error::DisperserResult;
use crate::types::metadata::BlobStatus;
use crate::utils::metrics::DISPERSER_METRICS;

/// Follows the chain's finalized head and promotes confirmed blobs whose
/// confirmation block can no longer be reorged.
pub struct Finalizer {
    blob_store: Arc<SharedBlobStore>,
    chain: Arc<dyn ChainClient>,
    interval: Duration,
}

impl Finalizer {
    pub fn new(blob_store: Arc<SharedBlobStore>, chain: Arc<dyn ChainClient>, interval: Duration) -> Self {
        Self { blob_store, chain, interval }
    }

    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("finalizer shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.finalize_confirmed_blobs().await {
                        warn!(error = %e, "finalization sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep: every `Confirmed` blob with
    /// `confirmation_block ≤ finalized head` becomes `Finalized`.
    pub async fn finalize_confirmed_blobs(&self) -> DisperserResult<()> {
        let finalized_head = self.chain.finalized_block_number().await?;
        debug!(finalized_head, "running finalization sweep");

        let confirmed = self.blob_store.get_blob_metadata_by_status(BlobStatus::Confirmed).await?;
        for metadata in confirmed {
            let Some(info) = &metadata.confirmation_info else {
                warn!(key = %metadata.blob_key(), "confirmed blob without confirmation info, skipping");
                continue;
            };
            if info.confirmation_block_number as u64 > finalized_head {
                continue;
            }
            match self.blob_store.mark_blob_finalized(&metadata.blob_key()).await {
                Ok(()) => {
                    DISPERSER_METRICS.blobs_finalized.add(1, &[]);
                    debug!(key = %metadata.blob_key(), "blob finalized");
                }
                Err(e) => warn!(key = %metadata.blob_key(), error = %e, "failed to finalize blob"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::chain::MockChainClient;
    use crate::core::client::database::MockDatabaseClient;
    use crate::core::client::storage::MockStorageClient;
    use crate::types::metadata::{BlobMetadata, ConfirmationInfo};

    fn confirmed_at(id: u8, block: u32) -> BlobMetadata {
        BlobMetadata {
            blob_hash: format!("{id:064x}"),
            metadata_hash: format!("{id:02x}"),
            blob_status: BlobStatus::Confirmed,
            confirmation_info: Some(ConfirmationInfo {
                confirmation_block_number: block,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn finalizer(database: MockDatabaseClient, chain: MockChainClient) -> Finalizer {
        let blob_store = Arc::new(SharedBlobStore::new(
            Arc::new(MockStorageClient::new()),
            Arc::new(database),
            false,
            Duration::ZERO,
        ));
        Finalizer::new(blob_store, Arc::new(chain), Duration::from_secs(360))
    }

    #[tokio::test]
    async fn promotes_only_blobs_at_or_below_the_finalized_head() {
        let mut chain = MockChainClient::new();
        chain.expect_finalized_block_number().returning(|| Ok(100));

        let mut database = MockDatabaseClient::new();
        database
            .expect_get_blob_metadata_by_status()
            .returning(|_| Ok(vec![confirmed_at(1, 99), confirmed_at(2, 100), confirmed_at(3, 101)]));
        database
            .expect_set_blob_status()
            .withf(|key, status| {
                *status == BlobStatus::Finalized && (key.metadata_hash == "01" || key.metadata_hash == "02")
            })
            .times(2)
            .returning(|_, _| Ok(()));

        finalizer(database, chain).finalize_confirmed_blobs().await.unwrap();
    }

    #[tokio::test]
    async fn chain_read_failure_leaves_statuses_untouched() {
        let mut chain = MockChainClient::new();
        chain.expect_finalized_block_number().returning(|| {
            Err(crate::core::client::chain::ChainError::Provider("timeout".to_string()))
        });

        let mut database = MockDatabaseClient::new();
        database.expect_get_blob_metadata_by_status().times(0);
        database.expect_set_blob_status().times(0);

        assert!(finalizer(database, chain).finalize_confirmed_blobs().await.is_err());
    }
}
