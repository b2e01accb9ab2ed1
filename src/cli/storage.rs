use clap::Args;

use crate::types::params::StorageParams;

/// Parameters for the S3 object store holding raw blob bytes.
#[derive(Debug, Clone, Args)]
pub struct StorageCliArgs {
    /// Name of the bucket to store blobs
    #[arg(env = "DISPERSER_S3_BUCKET_NAME", long)]
    pub s3_bucket_name: String,
}

impl From<&StorageCliArgs> for StorageParams {
    fn from(args: &StorageCliArgs) -> Self {
        Self { bucket_name: args.s3_bucket_name.clone() }
    }
}
