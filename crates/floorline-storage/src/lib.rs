//! Trade-document storage: objects live in an S3-compatible bucket and are
//! served to callers through short-lived presigned GET URLs.

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;

pub const DEFAULT_BUCKET: &str = "trade-documents";
const PRESIGN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone)]
pub struct DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a store from ambient AWS config plus an optional custom
    /// endpoint (MinIO and friends).
    pub async fn from_env(bucket: Option<String>, endpoint_url: Option<String>) -> Self {
        let base = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base).force_path_style(true);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        )
    }

    pub async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        tracing::debug!(key, bucket = %self.bucket, "document stored");
        Ok(())
    }

    /// Presigned GET, 1 hour TTL.
    pub async fn presigned_get(&self, key: &str) -> StorageResult<String> {
        let config = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|e| StorageError::S3(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        Ok(())
    }
}
