use std::time::Duration;

use alloy::primitives::{Address, B256};
use url::Url;

/// Object-store (S3) parameters.
#[derive(Debug, Clone)]
pub struct StorageParams {
    pub bucket_name: String,
}

/// Metadata-store (MongoDB) parameters.
#[derive(Debug, Clone)]
pub struct DatabaseParams {
    pub connection_uri: String,
    pub database_name: String,
    /// TTL applied to metadata rows. Zero disables expiry.
    pub ttl: Duration,
}

/// Chain access parameters shared by the confirmer, the finalizer and the
/// server's finalized-head mirror.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub rpc_url: Url,
    /// Hex private key of the batch-submitting account. Only the batcher
    /// needs it; the server reads the chain without signing.
    pub private_key: Option<String>,
    pub service_manager_address: Address,
    pub chain_read_timeout: Duration,
    pub chain_write_timeout: Duration,
    pub receipt_wait_rounds: u32,
    pub receipt_wait_interval: Duration,
}

/// Remote erasure-encoder parameters.
#[derive(Debug, Clone)]
pub struct EncoderParams {
    pub socket: Url,
    pub encoding_timeout: Duration,
    /// Connection-pool cap; requests in excess block for a slot.
    pub num_connections: usize,
}

/// Storage-cluster parameters: the nodes holding encoded payloads and the KV
/// stream carrying metadata records.
#[derive(Debug, Clone)]
pub struct StorageNodeParams {
    pub node_urls: Vec<Url>,
    pub kv_url: Url,
    pub stream_id: B256,
}

/// Batcher pipeline parameters.
#[derive(Debug, Clone)]
pub struct BatcherParams {
    pub pull_interval: Duration,
    /// Batch byte budget in MiB.
    pub batch_size_limit_mib: usize,
    pub encoding_request_queue_size: usize,
    pub max_num_retries_per_blob: u32,
    pub confirmer_num: usize,
    /// Encoder column count applied when a blob carries no per-request
    /// override. Zero lets the encoder choose.
    pub target_num_chunks: u32,
    pub finalizer_interval: Duration,
    pub metadata_hash_as_blob_key: bool,
}

/// Dispersal-server parameters.
#[derive(Debug, Clone)]
pub struct ServerParams {
    pub grpc_port: u16,
    pub metadata_hash_as_blob_key: bool,
    pub enable_ratelimiter: bool,
    /// HTTP header holding the forwarded client IP chain.
    pub client_ip_header: String,
    /// Aggregate ingress budget in bytes/second, applied to the shared
    /// system bucket.
    pub total_unauth_throughput: u32,
    /// Per-requester ingress budget in bytes/second.
    pub per_user_unauth_throughput: u32,
}

/// Leaky-bucket table shared by all requesters.
#[derive(Debug, Clone)]
pub struct RateLimitParams {
    pub bucket_sizes: Vec<Duration>,
    pub multipliers: Vec<f32>,
    /// Whether rejected requests still drain the buckets.
    pub count_failed: bool,
    /// Substring matches over requester ids that bypass rate limiting.
    pub allowlist: Vec<String>,
    /// Bound on the number of tracked requesters in the local bucket store.
    pub bucket_store_size: usize,
}

/// Metrics exposition parameters.
#[derive(Debug, Clone)]
pub struct MetricsParams {
    pub enable_metrics: bool,
    pub metrics_port: u16,
}
