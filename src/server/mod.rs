//! The dispersal RPC surface: blob ingestion with admission control, status
//! lookups with a storage-cluster KV fallback, and retrieval by batch
//! coordinate.

pub mod error;

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::cli::ServerRunCmd;
use crate::blobstore::SharedBlobStore;
use crate::core::client::chain::ChainClient;
use crate::core::client::storage_node::StorageNodeClient;
use crate::core::config::ServerConfig;
use crate::core::error::{DisperserError, DisperserResult};
use crate::grpc::disperser as pb;
use crate::grpc::disperser::disperser_server::{Disperser, DisperserServer};
use crate::ratelimit::RateLimiter;
use crate::types::blob::{Blob, BlobRequestHeader, SecurityParam, MAX_BLOB_SIZE};
use crate::types::key::BlobKey;
use crate::types::metadata::{BlobMetadata, BlobStatus};
use crate::types::params::ServerParams;
use crate::utils::metrics::{init_metrics, serve_metrics, DISPERSER_METRICS};

/// gRPC message cap, both directions.
const MAX_GRPC_MESSAGE_SIZE: usize = 300 * 1024 * 1024;

/// Requester id of the shared system-wide rate bucket.
const SYSTEM_ACCOUNT_KEY: &str = "system";

/// How many forwarding hops of the client-IP header to trust.
const TRUSTED_PROXY_HOPS: usize = 2;

const FINALIZED_BLOCK_MIRROR_INTERVAL: Duration = Duration::from_secs(5);

pub struct DispersalServer {
    blob_store: Arc<SharedBlobStore>,
    ratelimiter: Option<Arc<RateLimiter>>,
    storage_node: Arc<dyn StorageNodeClient>,
    params: ServerParams,
    /// Mirror of the chain's finalized head, advanced by a background loop.
    /// Readers are the status handlers; the mirror loop is the only writer.
    latest_finalized_block: Arc<RwLock<u32>>,
}

impl DispersalServer {
    pub fn new(
        blob_store: Arc<SharedBlobStore>,
        ratelimiter: Option<Arc<RateLimiter>>,
        storage_node: Arc<dyn StorageNodeClient>,
        params: ServerParams,
    ) -> Self {
        Self {
            blob_store,
            ratelimiter,
            storage_node,
            params,
            latest_finalized_block: Arc::new(RwLock::new(0)),
        }
    }

    fn latest_finalized_block(&self) -> u32 {
        *self.latest_finalized_block.read().expect("finalized block lock poisoned")
    }

    async fn disperse_blob_inner(
        &self,
        remote_addr: Option<SocketAddr>,
        metadata: &MetadataMap,
        request: pb::DisperseBlobRequest,
    ) -> DisperserResult<pb::DisperseBlobReply> {
        let blob_size = request.data.len();
        if blob_size > MAX_BLOB_SIZE {
            return Err(DisperserError::InvalidRequest(format!(
                "blob size cannot exceed {} KiB",
                MAX_BLOB_SIZE / 1024
            )));
        }
        if blob_size == 0 {
            return Err(DisperserError::InvalidRequest("blob size must be greater than 0".to_string()));
        }

        let blob = blob_from_request(request)?;
        blob.request_header.validate()?;

        let origin = client_address(metadata, &self.params.client_ip_header, TRUSTED_PROXY_HOPS, remote_addr)?;
        debug!(origin, blob_size, "received a new blob request");

        if let Some(ratelimiter) = &self.ratelimiter {
            if !ratelimiter
                .allow_request(SYSTEM_ACCOUNT_KEY, blob_size as u64, self.params.total_unauth_throughput)
                .await?
            {
                return Err(DisperserError::RateLimitedSystem);
            }
            if !ratelimiter
                .allow_request(&origin, blob_size as u64, self.params.per_user_unauth_throughput)
                .await?
            {
                return Err(DisperserError::RateLimitedAccount);
            }
        }

        let requested_at = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
        let key = self.blob_store.store_blob(&blob, requested_at).await?;

        DISPERSER_METRICS.ingested_bytes.add(blob_size as u64, &[]);
        info!(key = %key, "received a new blob");
        Ok(pb::DisperseBlobReply {
            result: pb::BlobStatus::Processing as i32,
            request_id: key.to_string().into_bytes(),
        })
    }

    async fn get_blob_status_inner(&self, request_id: Vec<u8>) -> DisperserResult<pb::BlobStatusReply> {
        if request_id.is_empty() {
            return Err(DisperserError::InvalidRequest("request_id must not be empty".to_string()));
        }
        let request_id_str = String::from_utf8(request_id.clone())
            .map_err(|_| DisperserError::InvalidRequest("request_id is not valid utf-8".to_string()))?;
        info!(request_id = request_id_str, "received a new blob status request");

        let key = BlobKey::parse(&request_id_str)?;

        let metadata = match self.blob_store.get_blob_metadata(&key).await {
            Ok(found) => found,
            Err(e) if self.params.metadata_hash_as_blob_key => {
                warn!(error = %e, "primary metadata lookup failed, falling back to kv");
                None
            }
            Err(e) => return Err(e),
        };

        let metadata = match metadata {
            Some(metadata) => metadata,
            None if self.params.metadata_hash_as_blob_key => self.metadata_from_kv(&request_id).await,
            // Behavior aligned with the metadata backend's soft-miss
            // semantics: an unknown key reads as still processing.
            None => BlobMetadata::default(),
        };

        Ok(build_status_reply(&metadata))
    }

    /// KV fallback for confirmed blobs whose primary metadata row is gone.
    /// The batcher publishes the record at upload time and the confirmer
    /// republishes it with the full confirmation; a record confirmed at or
    /// below the mirrored finalized head reads as finalized.
    async fn metadata_from_kv(&self, request_id: &[u8]) -> BlobMetadata {
        let entry = match self.storage_node.get_kv_entry(request_id).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "get metadata from kv failed");
                None
            }
        };

        let Some(bytes) = entry else {
            return BlobMetadata::default();
        };
        let mut metadata = match BlobMetadata::deserialize(&bytes) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "failed to deserialize kv metadata");
                return BlobMetadata::default();
            }
        };

        if metadata.blob_status.is_confirmed() {
            if let Some(info) = &metadata.confirmation_info {
                if info.confirmation_block_number <= self.latest_finalized_block() {
                    metadata.blob_status = BlobStatus::Finalized;
                }
            }
        }
        metadata
    }

    async fn retrieve_blob_inner(&self, request: pb::RetrieveBlobRequest) -> DisperserResult<pb::RetrieveBlobReply> {
        info!(blob_index = request.blob_index, "received a new blob retrieval request");

        if request.batch_header_hash.len() != 32 {
            return Err(DisperserError::InvalidRequest("batch_header_hash must be 32 bytes".to_string()));
        }
        let batch_header_hash = alloy::primitives::B256::from_slice(&request.batch_header_hash);

        let metadata = self
            .blob_store
            .get_metadata_in_batch(batch_header_hash, request.blob_index)
            .await?
            .ok_or_else(|| {
                DisperserError::NotFound(format!(
                    "no blob at index {} of batch {batch_header_hash}",
                    request.blob_index
                ))
            })?;

        let data = self.blob_store.get_blob_content(&metadata).await?;
        Ok(pb::RetrieveBlobReply { data: data.to_vec() })
    }
}

#[tonic::async_trait]
impl Disperser for DispersalServer {
    async fn disperse_blob(
        &self,
        request: Request<pb::DisperseBlobRequest>,
    ) -> Result<Response<pb::DisperseBlobReply>, Status> {
        let started = Instant::now();
        let remote_addr = request.remote_addr();
        let metadata = request.metadata().clone();

        let result = self.disperse_blob_inner(remote_addr, &metadata, request.into_inner()).await;
        observe_rpc("DisperseBlob", started, result.is_ok());
        result.map(Response::new).map_err(Status::from)
    }

    async fn get_blob_status(
        &self,
        request: Request<pb::BlobStatusRequest>,
    ) -> Result<Response<pb::BlobStatusReply>, Status> {
        let started = Instant::now();
        let result = self.get_blob_status_inner(request.into_inner().request_id).await;
        observe_rpc("GetBlobStatus", started, result.is_ok());
        result.map(Response::new).map_err(Status::from)
    }

    async fn retrieve_blob(
        &self,
        request: Request<pb::RetrieveBlobRequest>,
    ) -> Result<Response<pb::RetrieveBlobReply>, Status> {
        let started = Instant::now();
        let result = self.retrieve_blob_inner(request.into_inner()).await;
        observe_rpc("RetrieveBlob", started, result.is_ok());
        result.map(Response::new).map_err(Status::from)
    }
}

fn observe_rpc(operation: &'static str, started: Instant, success: bool) {
    let attributes = [KeyValue::new("operation", operation)];
    DISPERSER_METRICS.rpc_latency.record(started.elapsed().as_secs_f64() * 1000.0, &attributes);
    if success {
        DISPERSER_METRICS.successful_requests.add(1, &attributes);
    } else {
        DISPERSER_METRICS.failed_requests.add(1, &attributes);
    }
}

/// Origin IP of the request. The forwarded-for header is consulted first,
/// trusting the address `num_hops` entries from the end of the chain; a
/// direct connection falls back to the transport peer address.
fn client_address(
    metadata: &MetadataMap,
    header: &str,
    num_hops: usize,
    remote_addr: Option<SocketAddr>,
) -> DisperserResult<String> {
    if !header.is_empty() {
        if let Some(value) = metadata.get(header.to_lowercase()).and_then(|v| v.to_str().ok()) {
            let hops: Vec<&str> = value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
            if hops.len() >= num_hops {
                return Ok(hops[hops.len() - num_hops].to_string());
            }
            if let Some(last) = hops.last() {
                return Ok(last.to_string());
            }
        }
    }

    remote_addr
        .map(|addr| addr.ip().to_string())
        .ok_or_else(|| DisperserError::InvalidRequest("could not determine client address".to_string()))
}

fn blob_from_request(request: pb::DisperseBlobRequest) -> DisperserResult<Blob> {
    let mut security_params = Vec::with_capacity(request.security_params.len());
    for param in &request.security_params {
        let quorum_id = u8::try_from(param.quorum_id)
            .map_err(|_| DisperserError::InvalidRequest(format!("quorum id {} out of range", param.quorum_id)))?;
        let adversary_threshold = u8::try_from(param.adversary_threshold).map_err(|_| {
            DisperserError::InvalidRequest(format!("adversary threshold {} out of range", param.adversary_threshold))
        })?;
        let quorum_threshold = u8::try_from(param.quorum_threshold).map_err(|_| {
            DisperserError::InvalidRequest(format!("quorum threshold {} out of range", param.quorum_threshold))
        })?;
        security_params.push(SecurityParam { quorum_id, adversary_threshold, quorum_threshold });
    }

    Ok(Blob {
        request_header: BlobRequestHeader { security_params, target_row_num: request.target_row_num },
        data: Bytes::from(request.data),
    })
}

fn status_to_proto(status: BlobStatus) -> pb::BlobStatus {
    match status {
        BlobStatus::Processing => pb::BlobStatus::Processing,
        BlobStatus::Confirmed => pb::BlobStatus::Confirmed,
        BlobStatus::Failed => pb::BlobStatus::Failed,
        BlobStatus::Finalized => pb::BlobStatus::Finalized,
        BlobStatus::InsufficientSignatures => pb::BlobStatus::InsufficientSignatures,
    }
}

/// Builds the status reply. Confirmed and finalized blobs carry the complete
/// verification proof; everything else is status-only.
fn build_status_reply(metadata: &BlobMetadata) -> pb::BlobStatusReply {
    let status = status_to_proto(metadata.blob_status) as i32;

    let info = match (&metadata.confirmation_info, metadata.blob_status.is_confirmed()) {
        (Some(info), true) => info,
        _ => return pb::BlobStatusReply { status, info: Some(pb::BlobInfo::default()) },
    };

    let quorum_infos = &info.blob_quorum_infos;
    let mut blob_quorum_params = Vec::with_capacity(quorum_infos.len());
    let mut quorum_numbers = Vec::with_capacity(quorum_infos.len());
    let mut quorum_signed_percentages = Vec::with_capacity(quorum_infos.len());
    let mut quorum_indexes = Vec::with_capacity(quorum_infos.len());
    for (i, quorum_info) in quorum_infos.iter().enumerate() {
        blob_quorum_params.push(pb::BlobQuorumParam {
            quorum_number: quorum_info.security_param.quorum_id as u32,
            adversary_threshold_percentage: quorum_info.security_param.adversary_threshold as u32,
            quorum_threshold_percentage: quorum_info.security_param.quorum_threshold as u32,
            chunk_length: quorum_info.chunk_length,
        });
        quorum_numbers.push(quorum_info.security_param.quorum_id);
        quorum_signed_percentages.push(
            info.quorum_results
                .get(&quorum_info.security_param.quorum_id)
                .map(|r| r.percent_signed)
                .unwrap_or_default(),
        );
        quorum_indexes.push(i as u8);
    }

    pb::BlobStatusReply {
        status,
        info: Some(pb::BlobInfo {
            blob_header: Some(pb::BlobHeader {
                commitment_root: info.commitment_root.clone(),
                data_length: info.length as u32,
                blob_quorum_params,
            }),
            blob_verification_proof: Some(pb::BlobVerificationProof {
                batch_id: info.batch_id,
                blob_index: info.blob_index,
                batch_metadata: Some(pb::BatchMetadata {
                    batch_header: Some(pb::BatchHeader {
                        batch_root: info.batch_root.to_vec(),
                        quorum_numbers,
                        quorum_signed_percentages,
                        reference_block_number: info.reference_block_number,
                    }),
                    signatory_record_hash: info.signatory_record_hash.to_vec(),
                    fee: info.fee.clone(),
                    confirmation_block_number: info.confirmation_block_number,
                    batch_header_hash: info.batch_header_hash.to_vec(),
                }),
                inclusion_proof: info.blob_inclusion_proof.clone(),
                quorum_indexes,
            }),
        }),
    }
}

/// Background loop mirroring the chain's finalized head into the server. The
/// mirror only ever advances.
fn start_finalized_block_mirror(
    chain: Arc<dyn ChainClient>,
    latest_finalized_block: Arc<RwLock<u32>>,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FINALIZED_BLOCK_MIRROR_INTERVAL);
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = interval.tick() => {
                    match chain.finalized_block_number().await {
                        Ok(number) => {
                            let mut latest = latest_finalized_block.write().expect("finalized block lock poisoned");
                            if number as u32 > *latest {
                                *latest = number as u32;
                                DISPERSER_METRICS.latest_finalized_block.record(number, &[]);
                                debug!(number, "latest finalized block updated");
                            }
                        }
                        Err(e) => warn!(error = %e, "fetch latest finalized block number failed"),
                    }
                }
            }
        }
    })
}

/// Runs the dispersal server until interrupted.
pub async fn run_dispersal_server(cmd: &ServerRunCmd) -> DisperserResult<()> {
    let config = ServerConfig::from_run_cmd(cmd).await?;
    let cancellation_token = CancellationToken::new();

    if config.metrics().enable_metrics {
        let registry = init_metrics()?;
        serve_metrics(registry, config.metrics().metrics_port, cancellation_token.clone());
    }

    let params = config.params().clone();
    let server = DispersalServer::new(
        config.blob_store(),
        config.ratelimiter(),
        config.storage_node(),
        params.clone(),
    );

    if params.metadata_hash_as_blob_key {
        start_finalized_block_mirror(
            config.chain(),
            server.latest_finalized_block.clone(),
            cancellation_token.clone(),
        );
    }

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter.set_serving::<DisperserServer<DispersalServer>>().await;

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(pb::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| DisperserError::Internal(format!("failed to build reflection service: {e}")))?;

    let addr: SocketAddr = ([0, 0, 0, 0], params.grpc_port).into();
    info!(%addr, "grpc server listening");

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_token.cancel();
        }
    });

    Server::builder()
        .add_service(health_service)
        .add_service(reflection_service)
        .add_service(
            DisperserServer::new(server)
                .max_decoding_message_size(MAX_GRPC_MESSAGE_SIZE)
                .max_encoding_message_size(MAX_GRPC_MESSAGE_SIZE),
        )
        .serve_with_shutdown(addr, cancellation_token.cancelled())
        .await
        .map_err(|e| DisperserError::Internal(format!("grpc server failed: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::database::MockDatabaseClient;
    use crate::core::client::storage::MockStorageClient;
    use crate::core::client::storage_node::MockStorageNodeClient;
    use crate::ratelimit::LocalBucketStore;
    use crate::types::metadata::ConfirmationInfo;
    use crate::types::params::RateLimitParams;

    fn server_params(enable_ratelimiter: bool, metadata_hash_as_blob_key: bool) -> ServerParams {
        ServerParams {
            grpc_port: 0,
            metadata_hash_as_blob_key,
            enable_ratelimiter,
            client_ip_header: "x-forwarded-for".to_string(),
            total_unauth_throughput: 1000,
            per_user_unauth_throughput: 100,
        }
    }

    fn test_server(
        storage: MockStorageClient,
        database: MockDatabaseClient,
        storage_node: MockStorageNodeClient,
        params: ServerParams,
    ) -> DispersalServer {
        let blob_store = Arc::new(SharedBlobStore::new(
            Arc::new(storage),
            Arc::new(database),
            params.metadata_hash_as_blob_key,
            Duration::ZERO,
        ));
        let ratelimiter = params.enable_ratelimiter.then(|| {
            let rate_params = RateLimitParams {
                bucket_sizes: vec![Duration::from_secs(1)],
                multipliers: vec![1.0],
                count_failed: false,
                allowlist: vec![],
                bucket_store_size: 100,
            };
            Arc::new(RateLimiter::new(rate_params, Arc::new(LocalBucketStore::new(100))))
        });
        DispersalServer::new(blob_store, ratelimiter, Arc::new(storage_node), params)
    }

    fn disperse_request(size: usize) -> pb::DisperseBlobRequest {
        pb::DisperseBlobRequest {
            data: vec![0xaa; size],
            security_params: vec![pb::SecurityParams {
                quorum_id: 0,
                adversary_threshold: 25,
                quorum_threshold: 50,
            }],
            target_row_num: 0,
        }
    }

    fn remote() -> Option<SocketAddr> {
        Some(SocketAddr::from(([10, 0, 0, 1], 4000)))
    }

    #[tokio::test]
    async fn oversize_and_empty_blobs_are_rejected_before_any_write() {
        let mut database = MockDatabaseClient::new();
        database.expect_queue_new_blob_metadata().times(0);
        let mut storage = MockStorageClient::new();
        storage.expect_put_data().times(0);
        let server = test_server(storage, database, MockStorageNodeClient::new(), server_params(false, false));

        for size in [0, MAX_BLOB_SIZE + 1] {
            let result = server
                .disperse_blob_inner(remote(), &MetadataMap::new(), disperse_request(size))
                .await;
            assert!(matches!(result, Err(DisperserError::InvalidRequest(_))), "size {size}");
        }
    }

    #[tokio::test]
    async fn boundary_sizes_are_accepted() {
        let mut storage = MockStorageClient::new();
        storage.expect_put_data().times(2).returning(|_, _| Ok(()));
        let mut database = MockDatabaseClient::new();
        database.expect_queue_new_blob_metadata().times(2).returning(|_| Ok(()));
        let server = test_server(storage, database, MockStorageNodeClient::new(), server_params(false, false));

        for size in [1, MAX_BLOB_SIZE] {
            let reply = server
                .disperse_blob_inner(remote(), &MetadataMap::new(), disperse_request(size))
                .await
                .unwrap();
            assert_eq!(reply.result, pb::BlobStatus::Processing as i32);
            assert!(!reply.request_id.is_empty());
        }
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_account_limit() {
        let mut storage = MockStorageClient::new();
        storage.expect_put_data().times(1).returning(|_, _| Ok(()));
        let mut database = MockDatabaseClient::new();
        database.expect_queue_new_blob_metadata().times(1).returning(|_| Ok(()));

        let server = test_server(storage, database, MockStorageNodeClient::new(), server_params(true, false));

        // Draining the 1s account tier at 100 B/s: the first 60 B request is
        // admitted and stored, the second is rejected before any write.
        let first = server
            .disperse_blob_inner(remote(), &MetadataMap::new(), disperse_request(60))
            .await
            .unwrap();
        assert_eq!(first.result, pb::BlobStatus::Processing as i32);

        let second = server
            .disperse_blob_inner(remote(), &MetadataMap::new(), disperse_request(60))
            .await;
        assert!(matches!(second, Err(DisperserError::RateLimitedAccount)));
    }

    #[tokio::test]
    async fn unknown_key_reads_as_processing() {
        let mut database = MockDatabaseClient::new();
        database.expect_get_blob_metadata().returning(|_| Ok(None));
        let server =
            test_server(MockStorageClient::new(), database, MockStorageNodeClient::new(), server_params(false, false));

        let reply = server
            .get_blob_status_inner(format!("{}-{}", "aa".repeat(32), "bb".repeat(8)).into_bytes())
            .await
            .unwrap();
        assert_eq!(reply.status, pb::BlobStatus::Processing as i32);
    }

    #[tokio::test]
    async fn kv_fallback_reports_confirmed_and_upgrades_to_finalized() {
        let confirmed = BlobMetadata {
            blob_hash: "aa".repeat(32),
            metadata_hash: "bb".repeat(8),
            blob_status: BlobStatus::Confirmed,
            confirmation_info: Some(ConfirmationInfo {
                confirmation_block_number: 50,
                ..Default::default()
            }),
            ..Default::default()
        };
        let serialized = confirmed.serialize().unwrap();

        let mut database = MockDatabaseClient::new();
        database.expect_get_blob_metadata().returning(|_| Ok(None));
        let mut storage_node = MockStorageNodeClient::new();
        let entry = serialized.clone();
        storage_node.expect_get_kv_entry().returning(move |_| Ok(Some(entry.clone())));

        let server = test_server(MockStorageClient::new(), database, storage_node, server_params(false, true));

        // Finalized head below the confirmation block: reply stays Confirmed.
        let request_id = confirmed.blob_key().to_string().into_bytes();
        let reply = server.get_blob_status_inner(request_id.clone()).await.unwrap();
        assert_eq!(reply.status, pb::BlobStatus::Confirmed as i32);
        assert!(reply.info.unwrap().blob_verification_proof.is_some());

        // Once the mirror advances past it, the same entry reads Finalized.
        *server.latest_finalized_block.write().unwrap() = 50;
        let reply = server.get_blob_status_inner(request_id).await.unwrap();
        assert_eq!(reply.status, pb::BlobStatus::Finalized as i32);
    }

    #[test]
    fn forwarded_header_trusts_the_configured_hop() {
        let mut metadata = MetadataMap::new();
        metadata.insert("x-forwarded-for", "203.0.113.7, 198.51.100.2, 192.0.2.1".parse().unwrap());

        let address = client_address(&metadata, "x-forwarded-for", 2, remote()).unwrap();
        assert_eq!(address, "198.51.100.2");
    }

    #[test]
    fn missing_header_falls_back_to_the_peer_address() {
        let address = client_address(&MetadataMap::new(), "x-forwarded-for", 2, remote()).unwrap();
        assert_eq!(address, "10.0.0.1");

        assert!(client_address(&MetadataMap::new(), "x-forwarded-for", 2, None).is_err());
    }

    #[test]
    fn status_reply_is_status_only_until_confirmed() {
        let metadata = BlobMetadata::default();
        let reply = build_status_reply(&metadata);
        assert_eq!(reply.status, pb::BlobStatus::Processing as i32);
        assert!(reply.info.unwrap().blob_header.is_none());
    }
}
