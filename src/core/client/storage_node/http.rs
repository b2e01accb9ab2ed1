use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::core::client::storage_node::{StorageNodeClient, StorageNodeError};
use crate::types::params::StorageNodeParams;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct JsonRpcReply<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct KvValue {
    /// Hex-encoded entry bytes; empty when the key has never been written.
    data: String,
}

/// HTTP client for the storage cluster. Segment uploads go to every node URL;
/// KV traffic goes to the cluster's KV gateway as JSON-RPC, namespaced by the
/// 32-byte stream id.
pub struct HttpStorageNodeClient {
    client: reqwest::Client,
    params: StorageNodeParams,
}

impl HttpStorageNodeClient {
    pub fn new(params: StorageNodeParams) -> Result<Self, StorageNodeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageNodeError::Http(e.to_string()))?;
        Ok(Self { client, params })
    }

    async fn kv_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, StorageNodeError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let reply: JsonRpcReply<T> = self
            .client
            .post(self.params.kv_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageNodeError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| StorageNodeError::InvalidResponse(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(StorageNodeError::Rpc(format!("{} (code {})", error.message, error.code)));
        }
        reply.result.ok_or_else(|| StorageNodeError::InvalidResponse("missing result".to_string()))
    }
}

#[async_trait]
impl StorageNodeClient for HttpStorageNodeClient {
    async fn upload_encoded_batch(&self, payload: Bytes) -> Result<(), StorageNodeError> {
        let uploads = self.params.node_urls.iter().map(|node| {
            let url = node.join("v1/segment").map_err(|e| StorageNodeError::Http(e.to_string()));
            let payload = payload.clone();
            async move {
                let url = url?;
                let response = self
                    .client
                    .post(url.clone())
                    .body(payload)
                    .send()
                    .await
                    .map_err(|e| StorageNodeError::Http(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(StorageNodeError::UploadRejected {
                        url: url.to_string(),
                        message: response.status().to_string(),
                    });
                }
                Ok(())
            }
        });

        try_join_all(uploads).await?;
        debug!(nodes = self.params.node_urls.len(), bytes = payload.len(), "batch payload uploaded");
        Ok(())
    }

    async fn put_kv_entry(&self, key: &[u8], value: &[u8]) -> Result<(), StorageNodeError> {
        let params = json!([
            self.params.stream_id.to_string(),
            format!("0x{}", hex::encode(key)),
            format!("0x{}", hex::encode(value)),
        ]);
        self.kv_rpc::<bool>("kv_putValue", params).await?;
        Ok(())
    }

    async fn get_kv_entry(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageNodeError> {
        let params = json!([self.params.stream_id.to_string(), format!("0x{}", hex::encode(key))]);
        let value: KvValue = self.kv_rpc("kv_getValue", params).await?;
        if value.data.is_empty() {
            return Ok(None);
        }
        let bytes = hex::decode(value.data.trim_start_matches("0x"))
            .map_err(|e| StorageNodeError::InvalidResponse(e.to_string()))?;
        Ok(Some(bytes))
    }
}
