use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::core::client::encoder::{EncodedOutput, EncoderClient, EncoderError};
use crate::grpc::encoder::encoder_client::EncoderClient as EncoderRpcClient;
use crate::grpc::encoder::EncodeBlobRequest;
use crate::types::params::EncoderParams;

/// gRPC client over a single remote encoder endpoint. A semaphore caps the
/// number of in-flight calls at the configured connection-pool size; each
/// call carries the encoding timeout.
pub struct GrpcEncoderClient {
    channel: Channel,
    permits: Arc<Semaphore>,
    params: EncoderParams,
}

impl GrpcEncoderClient {
    pub fn new(params: EncoderParams) -> Result<Self, EncoderError> {
        let channel = Endpoint::from_shared(params.socket.to_string())
            .map_err(|e| EncoderError::Connection(e.to_string()))?
            .connect_lazy();
        let permits = Arc::new(Semaphore::new(params.num_connections));
        Ok(Self { channel, permits, params })
    }
}

#[async_trait]
impl EncoderClient for GrpcEncoderClient {
    async fn encode_blob(&self, data: Bytes, cols: u32) -> Result<EncodedOutput, EncoderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EncoderError::Connection(e.to_string()))?;

        let mut client = EncoderRpcClient::new(self.channel.clone());
        let request = EncodeBlobRequest { data: data.to_vec(), cols };

        debug!(blob_size = data.len(), cols, "dispatching encode request");
        let reply = tokio::time::timeout(self.params.encoding_timeout, client.encode_blob(request))
            .await
            .map_err(|_| EncoderError::Timeout(self.params.encoding_timeout))?
            .map_err(|e| EncoderError::Rpc(e.to_string()))?
            .into_inner();

        if reply.commitment.is_empty() {
            return Err(EncoderError::EmptyCommitment);
        }

        Ok(EncodedOutput {
            rows: reply.rows,
            cols: reply.cols,
            commitment: reply.commitment,
            chunks: Bytes::from(reply.chunks),
        })
    }
}
