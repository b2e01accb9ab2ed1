use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::DisperserError;

/// Hex-encoded sha256 of the blob content.
pub type BlobHash = String;

/// Hex-encoded request fingerprint derived from the request time and security
/// params. See `blobstore::metadata_hash` for the exact construction.
pub type MetadataHash = String;

/// Identifies one ingestion event. The same blob bytes arriving twice produce
/// two distinct keys because the metadata hash covers the request timestamp.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub blob_hash: BlobHash,
    pub metadata_hash: MetadataHash,
}

impl BlobKey {
    pub fn new(blob_hash: BlobHash, metadata_hash: MetadataHash) -> Self {
        Self { blob_hash, metadata_hash }
    }

    /// Parses the printable `<blobHash>-<metadataHash>` form.
    pub fn parse(s: &str) -> Result<Self, DisperserError> {
        let (blob_hash, metadata_hash) = s
            .split_once('-')
            .ok_or_else(|| DisperserError::InvalidRequest(format!("malformed blob key: {s}")))?;
        if blob_hash.is_empty() || metadata_hash.is_empty() {
            return Err(DisperserError::InvalidRequest(format!("malformed blob key: {s}")));
        }
        Ok(Self { blob_hash: blob_hash.to_string(), metadata_hash: metadata_hash.to_string() })
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.blob_hash, self.metadata_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_round_trip() {
        let key = BlobKey::new("aa".repeat(32), "bb".repeat(40));
        let parsed = BlobKey::parse(&key.to_string()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(BlobKey::parse("no-separator-is-fine-but").is_ok());
        assert!(BlobKey::parse("nodash").is_err());
        assert!(BlobKey::parse("-trailing").is_err());
        assert!(BlobKey::parse("leading-").is_err());
    }
}
