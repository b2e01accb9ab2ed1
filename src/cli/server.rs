use clap::Args;

use crate::types::params::ServerParams;

/// Parameters of the dispersal RPC server.
#[derive(Debug, Clone, Args)]
pub struct ServerCliArgs {
    /// Port the gRPC server listens on
    #[arg(env = "DISPERSER_SERVER_GRPC_PORT", long, default_value_t = 32001)]
    pub grpc_port: u16,

    /// Use the metadata hash as the blob object key
    #[arg(env = "DISPERSER_SERVER_METADATA_HASH_AS_BLOB_KEY", long, default_value_t = false)]
    pub metadata_hash_as_blob_key: bool,

    /// Enable leaky-bucket admission control
    #[arg(env = "DISPERSER_SERVER_ENABLE_RATELIMITER", long, default_value_t = false)]
    pub enable_ratelimiter: bool,

    /// HTTP header carrying the forwarded client IP chain
    #[arg(env = "DISPERSER_SERVER_CLIENT_IP_HEADER", long, default_value = "x-forwarded-for")]
    pub client_ip_header: String,

    /// Aggregate ingress budget in bytes/second across all requesters
    #[arg(env = "DISPERSER_SERVER_TOTAL_UNAUTH_THROUGHPUT", long, default_value_t = 10_485_760)]
    pub total_unauth_throughput: u32,

    /// Per-requester ingress budget in bytes/second
    #[arg(env = "DISPERSER_SERVER_PER_USER_UNAUTH_THROUGHPUT", long, default_value_t = 1_048_576)]
    pub per_user_unauth_throughput: u32,
}

impl From<&ServerCliArgs> for ServerParams {
    fn from(args: &ServerCliArgs) -> Self {
        Self {
            grpc_port: args.grpc_port,
            metadata_hash_as_blob_key: args.metadata_hash_as_blob_key,
            enable_ratelimiter: args.enable_ratelimiter,
            client_ip_header: args.client_ip_header.clone(),
            total_unauth_throughput: args.total_unauth_throughput,
            per_user_unauth_throughput: args.per_user_unauth_throughput,
        }
    }
}
