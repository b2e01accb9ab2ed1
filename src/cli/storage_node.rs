use std::str::FromStr;

use alloy::primitives::B256;
use clap::Args;
use url::Url;

use crate::core::error::DisperserError;
use crate::types::params::StorageNodeParams;

/// Parameters for the storage cluster holding encoded payloads and the KV
/// stream carrying metadata records.
#[derive(Debug, Clone, Args)]
pub struct StorageNodeCliArgs {
    /// Comma-separated storage node URLs; encoded payloads fan out to all
    #[arg(env = "DISPERSER_STORAGE_NODE_URLS", long, value_delimiter = ',', required = true)]
    pub storage_node_urls: Vec<Url>,

    /// KV gateway URL
    #[arg(env = "DISPERSER_STORAGE_KV_URL", long)]
    pub storage_kv_url: Url,

    /// 32-byte KV stream id, hex encoded
    #[arg(env = "DISPERSER_STORAGE_KV_STREAM_ID", long)]
    pub storage_kv_stream_id: String,
}

impl TryFrom<&StorageNodeCliArgs> for StorageNodeParams {
    type Error = DisperserError;

    fn try_from(args: &StorageNodeCliArgs) -> Result<Self, Self::Error> {
        let stream_id = B256::from_str(&args.storage_kv_stream_id)
            .map_err(|e| DisperserError::Config(format!("invalid kv stream id: {e}")))?;

        Ok(Self {
            node_urls: args.storage_node_urls.clone(),
            kv_url: args.storage_kv_url.clone(),
            stream_id,
        })
    }
}
