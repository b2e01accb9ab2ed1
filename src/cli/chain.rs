use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use clap::Args;
use url::Url;

use crate::core::error::DisperserError;
use crate::types::params::ChainParams;

/// Parameters for the chain the batches are confirmed on.
#[derive(Debug, Clone, Args)]
pub struct ChainCliArgs {
    /// JSON-RPC endpoint
    #[arg(env = "DISPERSER_CHAIN_RPC_URL", long)]
    pub chain_rpc_url: Url,

    /// Hex private key of the batch-submitting account; only the batcher
    /// needs it
    #[arg(env = "DISPERSER_CHAIN_PRIVATE_KEY", long)]
    pub chain_private_key: Option<String>,

    /// Address of the DA service-manager contract
    #[arg(env = "DISPERSER_CHAIN_SERVICE_MANAGER_ADDRESS", long)]
    pub service_manager_address: String,

    /// Timeout for chain reads, in seconds
    #[arg(env = "DISPERSER_CHAIN_READ_TIMEOUT", long, default_value_t = 5)]
    pub chain_read_timeout: u64,

    /// Timeout for chain writes, in seconds
    #[arg(env = "DISPERSER_CHAIN_WRITE_TIMEOUT", long, default_value_t = 90)]
    pub chain_write_timeout: u64,

    /// How many times to poll for a confirmation receipt
    #[arg(env = "DISPERSER_CHAIN_RECEIPT_WAIT_ROUNDS", long, default_value_t = 180)]
    pub receipt_wait_rounds: u32,

    /// Pause between receipt polls, in milliseconds
    #[arg(env = "DISPERSER_CHAIN_RECEIPT_WAIT_INTERVAL_MS", long, default_value_t = 1000)]
    pub receipt_wait_interval_ms: u64,
}

impl TryFrom<&ChainCliArgs> for ChainParams {
    type Error = DisperserError;

    fn try_from(args: &ChainCliArgs) -> Result<Self, Self::Error> {
        let service_manager_address = Address::from_str(&args.service_manager_address)
            .map_err(|e| DisperserError::Config(format!("invalid service manager address: {e}")))?;

        Ok(Self {
            rpc_url: args.chain_rpc_url.clone(),
            private_key: args.chain_private_key.clone(),
            service_manager_address,
            chain_read_timeout: Duration::from_secs(args.chain_read_timeout),
            chain_write_timeout: Duration::from_secs(args.chain_write_timeout),
            receipt_wait_rounds: args.receipt_wait_rounds,
            receipt_wait_interval: Duration::from_millis(args.receipt_wait_interval_ms),
        })
    }
}
