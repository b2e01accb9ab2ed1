use alloy::primitives::{keccak256, B256};

use crate::core::error::SerializationError;

/// Balanced binary Merkle tree with a keccak-256 node combiner. An odd layer
/// duplicates its last node before pairing, so every node has two children.
///
/// Proofs are the concatenated 32-byte siblings bottom-up; the leaf index
/// determines the left/right orientation at each level.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `layers[0]` are the leaves; the last layer is the root alone.
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<B256>) -> Result<Self, SerializationError> {
        if leaves.is_empty() {
            return Err(SerializationError::EmptyTree);
        }

        let mut layers = vec![leaves];
        while layers.last().expect("at least one layer").len() > 1 {
            let current = layers.last().expect("at least one layer");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                next.push(combine(&left, &right));
            }
            layers.push(next);
        }

        Ok(Self { layers })
    }

    pub fn root(&self) -> B256 {
        self.layers.last().expect("at least one layer")[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<Vec<u8>, SerializationError> {
        if index >= self.leaf_count() {
            return Err(SerializationError::LeafIndexOutOfRange { index, leaves: self.leaf_count() });
        }

        let mut proof = Vec::new();
        let mut position = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = if position % 2 == 0 {
                // Odd layers duplicate their last node.
                *layer.get(position + 1).unwrap_or(&layer[position])
            } else {
                layer[position - 1]
            };
            proof.extend_from_slice(sibling.as_slice());
            position /= 2;
        }
        Ok(proof)
    }
}

/// Walks a proof produced by [`MerkleTree::proof`] back up to a root.
pub fn verify_proof(leaf: B256, proof: &[u8], root: B256, index: usize) -> bool {
    if proof.len() % 32 != 0 {
        return false;
    }

    let mut hash = leaf;
    let mut position = index;
    for sibling in proof.chunks_exact(32) {
        let sibling = B256::from_slice(sibling);
        hash = if position % 2 == 0 { combine(&hash, &sibling) } else { combine(&sibling, &hash) };
        position /= 2;
    }
    hash == root
}

fn combine(left: &B256, right: &B256) -> B256 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_slice());
    data[32..].copy_from_slice(right.as_slice());
    keccak256(data)
}
