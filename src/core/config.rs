use std::sync::Arc;

use tracing::debug;

use crate::blobstore::SharedBlobStore;
use crate::cli::{BatcherRunCmd, ServerRunCmd};
use crate::core::client::chain::ethereum::EthereumChainClient;
use crate::core::client::chain::ChainClient;
use crate::core::client::database::mongodb::MongoDbClient;
use crate::core::client::database::DatabaseClient;
use crate::core::client::encoder::grpc::GrpcEncoderClient;
use crate::core::client::encoder::EncoderClient;
use crate::core::client::storage::s3::AWSS3;
use crate::core::client::storage::StorageClient;
use crate::core::client::storage_node::http::HttpStorageNodeClient;
use crate::core::client::storage_node::StorageNodeClient;
use crate::core::error::DisperserResult;
use crate::ratelimit::{LocalBucketStore, RateLimiter};
use crate::types::params::{
    BatcherParams, ChainParams, DatabaseParams, MetricsParams, RateLimitParams, ServerParams, StorageNodeParams,
    StorageParams,
};

/// Everything the dispersal server needs, wired from its CLI arguments.
pub struct ServerConfig {
    blob_store: Arc<SharedBlobStore>,
    chain: Arc<dyn ChainClient>,
    storage_node: Arc<dyn StorageNodeClient>,
    ratelimiter: Option<Arc<RateLimiter>>,
    params: ServerParams,
    metrics: MetricsParams,
}

impl ServerConfig {
    pub async fn from_run_cmd(cmd: &ServerRunCmd) -> DisperserResult<Self> {
        let params = ServerParams::from(&cmd.server_args);
        let database_params = DatabaseParams::from(&cmd.database_args);
        let (storage, database) = build_stores(&StorageParams::from(&cmd.storage_args), &database_params).await?;
        let blob_store = Arc::new(SharedBlobStore::new(
            storage,
            database,
            params.metadata_hash_as_blob_key,
            database_params.ttl,
        ));

        let chain_params = ChainParams::try_from(&cmd.chain_args)?;
        let chain: Arc<dyn ChainClient> = Arc::new(EthereumChainClient::new(chain_params)?);

        let storage_node_params = StorageNodeParams::try_from(&cmd.storage_node_args)?;
        let storage_node: Arc<dyn StorageNodeClient> = Arc::new(HttpStorageNodeClient::new(storage_node_params)?);

        let ratelimiter = if params.enable_ratelimiter {
            let rate_params = RateLimitParams::try_from(&cmd.ratelimit_args)?;
            let bucket_store = Arc::new(LocalBucketStore::new(rate_params.bucket_store_size));
            Some(Arc::new(RateLimiter::new(rate_params, bucket_store)))
        } else {
            None
        };

        debug!("server configuration initialized");
        Ok(Self {
            blob_store,
            chain,
            storage_node,
            ratelimiter,
            params,
            metrics: MetricsParams::from(&cmd.instrumentation_args),
        })
    }

    pub fn blob_store(&self) -> Arc<SharedBlobStore> {
        self.blob_store.clone()
    }

    pub fn chain(&self) -> Arc<dyn ChainClient> {
        self.chain.clone()
    }

    pub fn storage_node(&self) -> Arc<dyn StorageNodeClient> {
        self.storage_node.clone()
    }

    pub fn ratelimiter(&self) -> Option<Arc<RateLimiter>> {
        self.ratelimiter.clone()
    }

    pub fn params(&self) -> &ServerParams {
        &self.params
    }

    pub fn metrics(&self) -> &MetricsParams {
        &self.metrics
    }
}

/// Everything the batching pipeline needs, wired from its CLI arguments.
pub struct BatcherConfig {
    blob_store: Arc<SharedBlobStore>,
    chain: Arc<dyn ChainClient>,
    storage_node: Arc<dyn StorageNodeClient>,
    encoder: Arc<dyn EncoderClient>,
    params: BatcherParams,
    metrics: MetricsParams,
}

impl BatcherConfig {
    pub async fn from_run_cmd(cmd: &BatcherRunCmd) -> DisperserResult<Self> {
        let params = BatcherParams::from(&cmd.batcher_args);
        let database_params = DatabaseParams::from(&cmd.database_args);
        let (storage, database) = build_stores(&StorageParams::from(&cmd.storage_args), &database_params).await?;
        let blob_store = Arc::new(SharedBlobStore::new(
            storage,
            database,
            params.metadata_hash_as_blob_key,
            database_params.ttl,
        ));

        let chain_params = ChainParams::try_from(&cmd.chain_args)?;
        let chain: Arc<dyn ChainClient> = Arc::new(EthereumChainClient::new(chain_params)?);

        let storage_node_params = StorageNodeParams::try_from(&cmd.storage_node_args)?;
        let storage_node: Arc<dyn StorageNodeClient> = Arc::new(HttpStorageNodeClient::new(storage_node_params)?);

        let encoder: Arc<dyn EncoderClient> =
            Arc::new(GrpcEncoderClient::new((&cmd.encoder_args).into())?);

        debug!("batcher configuration initialized");
        Ok(Self {
            blob_store,
            chain,
            storage_node,
            encoder,
            params,
            metrics: MetricsParams::from(&cmd.instrumentation_args),
        })
    }

    pub fn blob_store(&self) -> Arc<SharedBlobStore> {
        self.blob_store.clone()
    }

    pub fn chain(&self) -> Arc<dyn ChainClient> {
        self.chain.clone()
    }

    pub fn storage_node(&self) -> Arc<dyn StorageNodeClient> {
        self.storage_node.clone()
    }

    pub fn encoder(&self) -> Arc<dyn EncoderClient> {
        self.encoder.clone()
    }

    pub fn params(&self) -> &BatcherParams {
        &self.params
    }

    pub fn metrics(&self) -> &MetricsParams {
        &self.metrics
    }
}

async fn build_stores(
    storage_params: &StorageParams,
    database_params: &DatabaseParams,
) -> DisperserResult<(Arc<dyn StorageClient>, Arc<dyn DatabaseClient>)> {
    let aws_config = aws_config::load_from_env().await;
    let storage: Arc<dyn StorageClient> = Arc::new(AWSS3::new(&aws_config, storage_params));
    let database: Arc<dyn DatabaseClient> = Arc::new(MongoDbClient::new(database_params).await?);
    Ok((storage, database))
}
