//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;

use crate::store::{ObjectStore, StorageError};

/// S3 connection configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket holding all uploads.
    pub bucket: String,
    /// Public base URL objects are served from, e.g.
    /// `https://uploads.example.com` or the bucket website endpoint.
    pub public_base_url: String,
}

/// Object store backed by an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3ObjectStore {
    /// Create a store from an already-configured SDK client.
    pub fn new(client: aws_sdk_s3::Client, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Create a store using the default AWS credential/region chain.
    pub async fn from_env(config: S3Config) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        allow_overwrite: bool,
    ) -> Result<String, StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(name)
            .body(ByteStream::from(bytes));

        // S3 writes overwrite by default; a conditional write opts out.
        if !allow_overwrite {
            request = request.if_none_match("*");
        }

        request.send().await.map_err(|e| {
            let code = e.code().unwrap_or_default();
            if code == "PreconditionFailed" {
                StorageError::AlreadyExists(name.to_string())
            } else {
                StorageError::Upload {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!(object = %name, bucket = %self.config.bucket, "Object stored");
        Ok(self.public_url(name))
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.config.public_base_url.trim_end_matches('/'), name)
    }
}
