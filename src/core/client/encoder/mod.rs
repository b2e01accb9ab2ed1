pub mod grpc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("encoder connection error: {0}")]
    Connection(String),

    #[error("encoder rpc error: {0}")]
    Rpc(String),

    #[error("encoding timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("encoder returned an empty commitment")]
    EmptyCommitment,
}

/// Erasure-encoded form of one blob as produced by the remote encoder. The
/// commitment scheme and chunk layout are opaque to the disperser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    pub rows: u32,
    pub cols: u32,
    pub commitment: Vec<u8>,
    pub chunks: Bytes,
}

/// Trait defining the erasure-encoder RPC. Implementations bound their
/// in-flight calls; a call in excess of the cap blocks until a slot frees or
/// the caller's cancellation fires.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncoderClient: Send + Sync {
    /// Encodes `data` into `cols` columns. Zero `cols` lets the encoder
    /// choose.
    async fn encode_blob(&self, data: Bytes, cols: u32) -> Result<EncodedOutput, EncoderError>;
}
