use std::time::Duration;

use clap::Args;

use crate::types::params::BatcherParams;

/// Parameters of the batching pipeline.
#[derive(Debug, Clone, Args)]
pub struct BatcherCliArgs {
    /// Interval between batcher pulls, in seconds
    #[arg(env = "BATCHER_PULL_INTERVAL", long, default_value_t = 60)]
    pub pull_interval: u64,

    /// Maximum batch size in MiB
    #[arg(env = "BATCHER_BATCH_SIZE_LIMIT", long, required = true)]
    pub batch_size_limit: usize,

    /// Capacity of the encoding request queue
    #[arg(env = "BATCHER_ENCODING_REQUEST_QUEUE_SIZE", long, default_value_t = 500)]
    pub encoding_request_queue_size: usize,

    /// Maximum number of retries before a blob is marked FAILED
    #[arg(env = "BATCHER_MAX_NUM_RETRIES_PER_BLOB", long, default_value_t = 2)]
    pub max_num_retries_per_blob: u32,

    /// Number of confirmer workers
    #[arg(env = "BATCHER_CONFIRMER_NUM", long, default_value_t = 1)]
    pub confirmer_num: usize,

    /// Target number of chunks per blob; 0 lets the encoder decide
    #[arg(env = "BATCHER_TARGET_NUM_CHUNKS", long, default_value_t = 0)]
    pub target_num_chunks: u32,

    /// Interval between finalization sweeps, in seconds
    #[arg(env = "BATCHER_FINALIZER_INTERVAL", long, default_value_t = 360)]
    pub finalizer_interval: u64,

    /// Use the metadata hash as the blob object key
    #[arg(env = "BATCHER_METADATA_HASH_AS_BLOB_KEY", long, default_value_t = false)]
    pub metadata_hash_as_blob_key: bool,
}

impl From<&BatcherCliArgs> for BatcherParams {
    fn from(args: &BatcherCliArgs) -> Self {
        Self {
            pull_interval: Duration::from_secs(args.pull_interval),
            batch_size_limit_mib: args.batch_size_limit,
            encoding_request_queue_size: args.encoding_request_queue_size,
            max_num_retries_per_blob: args.max_num_retries_per_blob,
            confirmer_num: args.confirmer_num.max(1),
            target_num_chunks: args.target_num_chunks,
            finalizer_interval: Duration::from_secs(args.finalizer_interval),
            metadata_hash_as_blob_key: args.metadata_hash_as_blob_key,
        }
    }
}
