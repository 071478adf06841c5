//! Attachment uploads through presigned object-storage URLs.

pub mod attachments;
pub mod handlers;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

use crate::config::DriveConfig;

pub use attachments::AttachmentService;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to presign upload: {0}")]
    Presign(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn bucket(&self) -> &str;
    /// URL the client can `PUT` the object body to directly.
    async fn presign_put(
        &self,
        object_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;
}

/// S3-compatible storage (MinIO in development).
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    expiry: Duration,
}

impl S3Storage {
    pub async fn connect(config: &DriveConfig) -> Self {
        let endpoint = if config.endpoint.ends_with('/') {
            config.endpoint.clone()
        } else {
            format!("{}/", config.endpoint)
        };

        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region("auto")
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            expiry: Duration::from_secs(config.presign_expiry_secs),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn presign_put(
        &self,
        object_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(self.expiry)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_name);
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        let presigned = request
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }
}
