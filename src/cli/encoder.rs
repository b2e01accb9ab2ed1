use std::time::Duration;

use clap::Args;
use url::Url;

use crate::types::params::EncoderParams;

/// Parameters for the remote erasure-encoder service.
#[derive(Debug, Clone, Args)]
pub struct EncoderCliArgs {
    /// URL the encoder server is listening on
    #[arg(env = "BATCHER_ENCODER_ADDRESS", long)]
    pub encoder_socket: Url,

    /// Timeout for one encoding call, in seconds
    #[arg(env = "BATCHER_ENCODING_TIMEOUT", long, default_value_t = 10)]
    pub encoding_timeout: u64,

    /// Maximum number of in-flight encoder calls
    #[arg(env = "BATCHER_NUM_CONNECTIONS", long, default_value_t = 256)]
    pub num_connections: usize,
}

impl From<&EncoderCliArgs> for EncoderParams {
    fn from(args: &EncoderCliArgs) -> Self {
        Self {
            socket: args.encoder_socket.clone(),
            encoding_timeout: Duration::from_secs(args.encoding_timeout),
            num_connections: args.num_connections,
        }
    }
}
