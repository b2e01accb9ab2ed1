use alloy::primitives::B256;
use bytes::Bytes;

use crate::core::serialization::MerkleTree;
use crate::types::metadata::{BlobMetadata, BlobQuorumInfo};

/// Header committed on chain for one batch. The reference block number is
/// carried for bookkeeping; the encoded-for-hash form pins it to zero (see
/// `BatchHeader::encode`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchHeader {
    /// Merkle root over the batch's blob header hashes.
    pub batch_root: B256,
    pub reference_block_number: u32,
}

/// Per-blob header whose hash is a leaf of the batch Merkle tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobHeader {
    /// Merkle root over the blob's per-quorum commitment hashes. Opaque bytes
    /// produced from the encoder's commitment.
    pub commitment_root: Vec<u8>,
    /// Encoded data length reported by the encoder.
    pub data_length: u64,
    pub blob_quorum_infos: Vec<BlobQuorumInfo>,
}

/// A blob that survived the encoding fan-out of one batcher pull.
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub metadata: BlobMetadata,
    pub blob_header: BlobHeader,
    pub chunks: Bytes,
    pub rows: u32,
    pub cols: u32,
}

/// Ephemeral grouping produced by one batcher pull. Owned by a single batcher
/// task from construction through hand-off to the confirmer; blob indices are
/// assigned in packing order and stay stable through confirmation.
#[derive(Debug)]
pub struct Batch {
    pub header: BatchHeader,
    pub blobs: Vec<EncodedBlob>,
    /// Tree over blob header hashes; source of per-blob inclusion proofs.
    pub merkle_tree: MerkleTree,
}
