/// Blob payloads and their security parameterization.
pub mod blob;
/// Blob identification keys.
pub mod key;
/// Blob metadata, status state machine and confirmation records.
pub mod metadata;
/// Ephemeral batch types produced by the batcher.
pub mod batch;
/// Runtime parameter structs derived from CLI arguments.
pub mod params;

pub use blob::{Blob, BlobRequestHeader, SecurityParam, MAX_BLOB_SIZE};
pub use key::{BlobHash, BlobKey, MetadataHash};
pub use metadata::{BlobMetadata, BlobQuorumInfo, BlobStatus, ConfirmationInfo, RequestMetadata};
