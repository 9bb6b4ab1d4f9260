//! Object storage: the `ObjectStore` seam and its S3 implementation.
//!
//! The delivery stage talks to storage through [`ObjectStore`] rather than a
//! concrete SDK client. The indirection buys two things: tests run against a
//! recording mock with no network or credentials, and callers can wrap the
//! real client (caching, rate limits) before injecting it via
//! [`crate::config::JobConfigBuilder::store`].

use crate::config::StorageConfig;
use crate::error::PaperboyError;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::{debug, info};

/// A bucket-scoped object store capable of receiving local files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store writes into.
    fn bucket(&self) -> &str;

    /// Confirm the bucket exists and the credentials can reach it.
    ///
    /// Called once per attempt before any transfer, so a misconfigured
    /// bucket fails fast instead of after the cover upload.
    async fn verify_bucket(&self) -> Result<(), PaperboyError>;

    /// Upload a local file under `key`. Returns the byte count transferred.
    async fn put_file(
        &self,
        key: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<u64, PaperboyError>;
}

/// [`ObjectStore`] backed by the AWS S3 SDK.
///
/// Works against AWS itself or any S3-compatible service via
/// [`StorageConfig::endpoint`] (path-style addressing is forced when an
/// endpoint override is present, which is what MinIO and Backblaze expect).
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from explicit credentials.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.key_id.clone(),
            config.key.clone(),
            None,
            None,
            "paperboy",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn verify_bucket(&self) -> Result<(), PaperboyError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| PaperboyError::BucketUnavailable {
                bucket: self.bucket.clone(),
                reason: format!("{}", DisplayErrorContext(&e)),
            })?;
        debug!("Bucket '{}' is reachable", self.bucket);
        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<u64, PaperboyError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|_| PaperboyError::MissingFile {
                path: path.to_path_buf(),
            })?
            .len();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| PaperboyError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| PaperboyError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                reason: format!("{}", DisplayErrorContext(&e)),
            })?;

        info!("Uploaded {} ({} bytes) to '{}'", key, size, self.bucket);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_store_carries_bucket_name() {
        let store = S3ObjectStore::new(&StorageConfig {
            key_id: "AKIA123".into(),
            key: "secret".into(),
            bucket: "epaper-archive".into(),
            region: "eu-west-1".into(),
            endpoint: Some("http://127.0.0.1:9000".into()),
        });
        assert_eq!(store.bucket(), "epaper-archive");
    }
}
