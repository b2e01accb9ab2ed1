//! Wire encodings committed on chain: ABI forms of the batch header, blob
//! header hashing, and the keccak Merkle trees binding blobs to batches.

mod merkle;

pub use merkle::{verify_proof, MerkleTree};

use alloy::primitives::{keccak256, B256};
use alloy::sol_types::SolValue;

use crate::core::error::SerializationError;
use crate::types::batch::{BatchHeader, BlobHeader};

impl BatchHeader {
    /// ABI-encodes the tuple `(bytes32 blobHeadersRoot, uint32
    /// referenceBlockNumber)`. The field order matches the service-manager
    /// contract's reduced batch header, and the reference block number is
    /// pinned to zero in this form regardless of the header's own value; the
    /// on-chain hasher expects exactly that.
    pub fn encode(&self) -> Vec<u8> {
        (self.batch_root, 0u32).abi_encode()
    }

    /// Hash the contract uses to identify the batch.
    pub fn batch_header_hash(&self) -> B256 {
        keccak256(self.encode())
    }
}

impl BlobHeader {
    /// The blob header's signable form is its commitment root.
    pub fn encode(&self) -> Result<&[u8], SerializationError> {
        if self.commitment_root.is_empty() {
            return Err(SerializationError::InvalidCommitment);
        }
        Ok(&self.commitment_root)
    }

    pub fn blob_header_hash(&self) -> Result<B256, SerializationError> {
        Ok(keccak256(self.encode()?))
    }
}

/// Merkle root over the hashes of a blob's per-quorum commitments. Current
/// usage passes a single commitment, making the root
/// `keccak256(commitment)`; the construction generalizes to several quorums.
pub fn commitment_root(commitments: &[Vec<u8>]) -> Result<B256, SerializationError> {
    let leaves = commitments.iter().map(|c| keccak256(c)).collect();
    Ok(MerkleTree::new(leaves)?.root())
}

/// Builds the batch tree over blob header hashes and stamps the root into the
/// header.
pub fn set_batch_root(
    header: &mut BatchHeader,
    blob_headers: &[BlobHeader],
) -> Result<MerkleTree, SerializationError> {
    let leaves = blob_headers.iter().map(|h| h.blob_header_hash()).collect::<Result<Vec<_>, _>>()?;
    let tree = MerkleTree::new(leaves)?;
    header.batch_root = tree.root();
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_header_encoding_is_the_static_abi_tuple() {
        let header = BatchHeader { batch_root: B256::repeat_byte(0xab), reference_block_number: 17 };
        let encoded = header.encode();

        // bytes32 followed by a left-padded uint32 that is always zero.
        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[..32], B256::repeat_byte(0xab).as_slice());
        assert_eq!(&encoded[32..], &[0u8; 32]);

        assert_eq!(header.batch_header_hash(), keccak256(encoded));
    }

    #[test]
    fn reference_block_number_does_not_affect_the_hash() {
        let a = BatchHeader { batch_root: B256::repeat_byte(0x01), reference_block_number: 0 };
        let b = BatchHeader { batch_root: B256::repeat_byte(0x01), reference_block_number: 99 };
        assert_eq!(a.batch_header_hash(), b.batch_header_hash());
    }

    #[test]
    fn blob_header_requires_a_commitment() {
        let header = BlobHeader::default();
        assert!(header.encode().is_err());

        let header = BlobHeader { commitment_root: vec![1, 2, 3], ..Default::default() };
        assert_eq!(header.blob_header_hash().unwrap(), keccak256([1, 2, 3]));
    }

    #[test]
    fn single_commitment_root_is_the_commitment_hash() {
        let commitment = vec![0x42; 48];
        let root = commitment_root(std::slice::from_ref(&commitment)).unwrap();
        assert_eq!(root, keccak256(&commitment));
    }

    #[test]
    fn batch_root_covers_every_blob_header() {
        let headers: Vec<BlobHeader> = (0u8..3)
            .map(|i| BlobHeader { commitment_root: vec![i; 32], ..Default::default() })
            .collect();
        let mut batch_header = BatchHeader::default();
        let tree = set_batch_root(&mut batch_header, &headers).unwrap();

        assert_eq!(batch_header.batch_root, tree.root());
        for (i, header) in headers.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(header.blob_header_hash().unwrap(), &proof, batch_header.batch_root, i));
        }
    }
}
