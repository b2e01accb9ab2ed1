use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::error::DisperserError;

/// Largest blob accepted for dispersal, in bytes.
pub const MAX_BLOB_SIZE: usize = 2 * 1024 * 1024;

/// Identifies a quorum of the DA committee.
pub type QuorumId = u8;

/// Security parameterization of one quorum for one blob.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityParam {
    pub quorum_id: QuorumId,
    /// Max adversarial stake percentage tolerated by this quorum.
    pub adversary_threshold: u8,
    /// Percentage of the quorum that must hold the blob; at most 100.
    pub quorum_threshold: u8,
}

impl SecurityParam {
    /// A parameterization is well-formed when the adversary threshold is
    /// strictly below the quorum threshold and the quorum threshold is a
    /// percentage.
    pub fn validate(&self) -> Result<(), DisperserError> {
        if self.quorum_threshold > 100 {
            return Err(DisperserError::InvalidRequest(format!(
                "quorum threshold must be at most 100, got {}",
                self.quorum_threshold
            )));
        }
        if self.adversary_threshold >= self.quorum_threshold {
            return Err(DisperserError::InvalidRequest(format!(
                "adversary threshold ({}) must be less than quorum threshold ({})",
                self.adversary_threshold, self.quorum_threshold
            )));
        }
        Ok(())
    }
}

/// Header accompanying every dispersal request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobRequestHeader {
    /// Ordered; quorum ids must be unique within one header.
    pub security_params: Vec<SecurityParam>,
    /// Per-blob override for the encoder column count. Zero defers to the
    /// batcher configuration (and ultimately to the encoder).
    pub target_row_num: u32,
}

impl BlobRequestHeader {
    pub fn validate(&self) -> Result<(), DisperserError> {
        if self.security_params.is_empty() {
            return Err(DisperserError::InvalidRequest("security params must not be empty".to_string()));
        }
        let mut seen = [false; 256];
        for param in &self.security_params {
            if seen[param.quorum_id as usize] {
                return Err(DisperserError::InvalidRequest(format!(
                    "duplicate quorum id {} in security params",
                    param.quorum_id
                )));
            }
            seen[param.quorum_id as usize] = true;
            param.validate()?;
        }
        Ok(())
    }
}

/// An opaque client payload together with its request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub request_header: BlobRequestHeader,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(quorum_id: u8, adversary: u8, quorum: u8) -> SecurityParam {
        SecurityParam { quorum_id, adversary_threshold: adversary, quorum_threshold: quorum }
    }

    #[test]
    fn security_param_thresholds_are_checked() {
        assert!(param(0, 25, 50).validate().is_ok());
        assert!(param(0, 50, 50).validate().is_err());
        assert!(param(0, 25, 101).validate().is_err());
    }

    #[test]
    fn duplicate_quorum_ids_are_rejected() {
        let header = BlobRequestHeader {
            security_params: vec![param(1, 25, 50), param(1, 30, 80)],
            target_row_num: 0,
        };
        assert!(header.validate().is_err());
    }

    #[test]
    fn empty_security_params_are_rejected() {
        let header = BlobRequestHeader::default();
        assert!(header.validate().is_err());
    }
}
