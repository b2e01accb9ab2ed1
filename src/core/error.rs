use thiserror::Error;

use crate::core::client::chain::ChainError;
use crate::core::client::database::DatabaseError;
use crate::core::client::encoder::EncoderError;
use crate::core::client::storage::StorageError;
use crate::core::client::storage_node::StorageNodeError;

pub type DisperserResult<T> = Result<T, DisperserError>;

/// Top-level error taxonomy. RPC handlers map these onto status codes;
/// the batcher maps per-blob failures onto the retry policy.
#[derive(Error, Debug)]
pub enum DisperserError {
    /// Size bounds, empty fields, malformed keys. Returned to the caller and
    /// never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request ratelimited: system limit")]
    RateLimitedSystem,

    #[error("request ratelimited: account limit")]
    RateLimitedAccount,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("storage node error: {0}")]
    StorageNode(#[from] StorageNodeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SerializationError {
    #[error("cannot build a merkle tree with no leaves")]
    EmptyTree,

    #[error("leaf index {index} out of range for tree with {leaves} leaves")]
    LeafIndexOutOfRange { index: usize, leaves: usize },

    #[error("invalid commitment")]
    InvalidCommitment,
}
