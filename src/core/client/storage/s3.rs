use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::params::StorageParams;

/// S3-backed object store. Blobs are write-once; the content-addressed key
/// scheme of the blob store means concurrent writers of the same key write
/// the same bytes.
#[derive(Clone, Debug)]
pub struct AWSS3 {
    client: Client,
    bucket_name: String,
}

impl AWSS3 {
    pub fn new(aws_config: &SdkConfig, params: &StorageParams) -> Self {
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(aws_config);
        s3_config_builder.set_force_path_style(Some(true));
        let client = Client::from_conf(s3_config_builder.build());
        Self { client, bucket_name: params.bucket_name.clone() }
    }
}

#[async_trait]
impl StorageClient for AWSS3 {
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError> {
        let output =
            self.client.get_object().bucket(&self.bucket_name).key(key).send().await.map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    GetObjectError::NoSuchKey(_) => StorageError::NotFound(key.to_string()),
                    _ => StorageError::Backend(e.to_string()),
                },
                _ => StorageError::Backend(e.to_string()),
            })?;

        let data = output.body.collect().await.map_err(|e| StorageError::ObjectStreamError(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn put_data(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete_data(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
