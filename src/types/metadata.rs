use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::core::error::DisperserError;
use crate::types::blob::{BlobRequestHeader, QuorumId, SecurityParam};
use crate::types::key::BlobKey;

/// Lifecycle of a dispersed blob.
///
/// ```text
/// Processing ──► Confirmed ──► Finalized
///      │             │
///      └──► Failed   └──► InsufficientSignatures
/// ```
///
/// Transitions are monotonic except that `Processing` recurs on retry. Only
/// the batcher, confirmer and finalizer write terminal states.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobStatus {
    #[default]
    Processing,
    Confirmed,
    Failed,
    Finalized,
    InsufficientSignatures,
}

impl BlobStatus {
    /// A blob carries a complete verification proof once its batch is on
    /// chain, whether or not the chain head has finalized past it.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BlobStatus::Confirmed | BlobStatus::Finalized)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BlobStatus::Failed | BlobStatus::Finalized | BlobStatus::InsufficientSignatures)
    }
}

impl fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobStatus::Processing => write!(f, "Processing"),
            BlobStatus::Confirmed => write!(f, "Confirmed"),
            BlobStatus::Failed => write!(f, "Failed"),
            BlobStatus::Finalized => write!(f, "Finalized"),
            BlobStatus::InsufficientSignatures => write!(f, "InsufficientSignatures"),
        }
    }
}

/// Immutable facts about the original dispersal request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub blob_request_header: BlobRequestHeader,
    /// Size of the raw blob in bytes.
    pub blob_size: u64,
    /// Request arrival time in unix nanoseconds. Part of the blob key.
    pub requested_at: u64,
}

/// Per-quorum dispersal outcome attached to a confirmed blob.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobQuorumInfo {
    #[serde(flatten)]
    pub security_param: SecurityParam,
    pub chunk_length: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumResult {
    pub percent_signed: u8,
}

/// Written exactly once when a blob's batch is confirmed on chain; immutable
/// thereafter.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationInfo {
    pub batch_id: u32,
    pub blob_index: u32,
    pub batch_root: B256,
    pub reference_block_number: u32,
    pub batch_header_hash: B256,
    pub signatory_record_hash: B256,
    pub fee: Vec<u8>,
    pub confirmation_block_number: u32,
    /// Merkle path from the blob header hash to the batch root, as
    /// concatenated 32-byte siblings bottom-up.
    pub blob_inclusion_proof: Vec<u8>,
    pub commitment_root: Vec<u8>,
    /// Encoded data length reported by the encoder.
    pub length: u64,
    pub blob_quorum_infos: Vec<BlobQuorumInfo>,
    pub quorum_results: BTreeMap<QuorumId, QuorumResult>,
}

/// The metadata record tracked for every ingestion event.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobMetadata {
    pub blob_hash: String,
    pub metadata_hash: String,
    pub blob_status: BlobStatus,
    /// Only ever increases; reaching the configured cap moves the blob from
    /// `Processing` to `Failed`.
    pub num_retries: u32,
    /// Unix seconds after which the record may be dropped. Zero means never.
    pub expiry: u64,
    pub request_metadata: RequestMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_info: Option<ConfirmationInfo>,
}

impl BlobMetadata {
    pub fn blob_key(&self) -> BlobKey {
        BlobKey::new(self.blob_hash.clone(), self.metadata_hash.clone())
    }

    /// Serializes the record for transit (the storage cluster's KV stream).
    /// The only cross-implementation requirement on this form is that
    /// `deserialize(serialize(m)) == m`.
    pub fn serialize(&self) -> Result<Vec<u8>, DisperserError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DisperserError> {
        Ok(serde_json::from_slice(data)?)
    }
}
