use std::time::Duration;

use clap::Args;

use crate::core::error::DisperserError;
use crate::types::params::RateLimitParams;

/// Leaky-bucket table configuration. The bucket sizes and multipliers are
/// parallel lists; one tier per entry.
#[derive(Debug, Clone, Args)]
pub struct RateLimitCliArgs {
    /// Comma-separated bucket sizes in seconds, one per tier
    #[arg(env = "DISPERSER_SERVER_BUCKET_SIZES", long, value_delimiter = ',', default_values_t = [5u64, 1800])]
    pub bucket_sizes: Vec<u64>,

    /// Comma-separated rate multipliers, one per tier
    #[arg(env = "DISPERSER_SERVER_BUCKET_MULTIPLIERS", long, value_delimiter = ',', default_values_t = [1.0f32, 10.0])]
    pub bucket_multipliers: Vec<f32>,

    /// Whether rejected requests still drain the buckets
    #[arg(env = "DISPERSER_SERVER_COUNT_FAILED", long, default_value_t = false)]
    pub count_failed: bool,

    /// Comma-separated requester-id substrings that bypass rate limiting
    #[arg(env = "DISPERSER_SERVER_ALLOWLIST", long, value_delimiter = ',', num_args = 0..)]
    pub allowlist: Vec<String>,

    /// Bound on the number of tracked requesters
    #[arg(env = "DISPERSER_SERVER_BUCKET_STORE_SIZE", long, default_value_t = 100_000)]
    pub bucket_store_size: usize,
}

impl TryFrom<&RateLimitCliArgs> for RateLimitParams {
    type Error = DisperserError;

    fn try_from(args: &RateLimitCliArgs) -> Result<Self, Self::Error> {
        if args.bucket_sizes.is_empty() || args.bucket_sizes.len() != args.bucket_multipliers.len() {
            return Err(DisperserError::Config(format!(
                "bucket sizes ({}) and multipliers ({}) must be non-empty parallel lists",
                args.bucket_sizes.len(),
                args.bucket_multipliers.len()
            )));
        }

        Ok(Self {
            bucket_sizes: args.bucket_sizes.iter().map(|s| Duration::from_secs(*s)).collect(),
            multipliers: args.bucket_multipliers.clone(),
            count_failed: args.count_failed,
            allowlist: args.allowlist.clone(),
            bucket_store_size: args.bucket_store_size,
        })
    }
}
