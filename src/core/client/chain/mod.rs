pub mod ethereum;

use alloy::primitives::B256;
use async_trait::async_trait;
use thiserror::Error;

use crate::types::batch::{BatchHeader, BlobHeader};

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("no receipt for transaction {tx_hash} after {rounds} rounds")]
    ReceiptTimeout { tx_hash: B256, rounds: u32 },

    #[error("receipt for transaction {0} carries no batch confirmation event")]
    MissingConfirmationEvent(B256),

    #[error("chain call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("missing signer key for batch submission")]
    MissingSigner,
}

/// Outcome of a successful batch submission, read from the confirmation
/// receipt. The contract assigns the batch id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfirmation {
    pub batch_id: u32,
    pub confirmation_block_number: u32,
    pub fee: Vec<u8>,
    pub signatory_record_hash: B256,
}

/// Trait defining chain operations: batch submission with receipt tracking,
/// and finalized-head queries for the finalizer and the server mirror.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submits the batch confirmation transaction and waits for a success
    /// receipt. Only returns once the batch is on chain or the receipt wait
    /// is exhausted.
    async fn confirm_batch(
        &self,
        header: &BatchHeader,
        blob_headers: &[BlobHeader],
    ) -> Result<BatchConfirmation, ChainError>;

    /// Number of the latest finalized block.
    async fn finalized_block_number(&self) -> Result<u64, ChainError>;
}
