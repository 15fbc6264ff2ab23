use async_trait::async_trait;
use aws_sdk_s3::{config::Credentials as AwsCredentials, primitives::ByteStream};
use chrono::Utc;
use tracing::{error, info, instrument};

use crate::config::Credentials;
use crate::error::{FilterError, FilterResult};

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Object key for an upload made at `timestamp_ms`.
///
/// Two uploads in the same millisecond get the same key and the later one
/// overwrites the earlier.
pub fn object_key(timestamp_ms: i64) -> String {
    format!("filtered_{}.jpg", timestamp_ms)
}

/// Virtual-hosted-style URL of `key` in `bucket`
pub fn public_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

/// Stores filtered images and reports where they can be fetched
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, buffer: Vec<u8>, bucket_name: &str) -> FilterResult<String>;
}

/// S3 client wrapper for filtered image uploads
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from resolved credentials. Performs no network calls.
    pub async fn from_credentials(credentials: &Credentials) -> Self {
        let provider = AwsCredentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            "environment",
        );

        let aws_config = aws_config::from_env()
            .region(aws_config::Region::new(credentials.region.clone()))
            .credentials_provider(provider)
            .load()
            .await;

        Self::new(aws_sdk_s3::Client::new(&aws_config))
    }
}

#[async_trait]
impl ImageStore for S3Client {
    #[instrument(skip(self, buffer), fields(bytes = buffer.len()))]
    async fn upload(&self, buffer: Vec<u8>, bucket_name: &str) -> FilterResult<String> {
        if buffer.is_empty() {
            return Err(FilterError::Upload("refusing to upload an empty image".to_string()));
        }

        let key = object_key(Utc::now().timestamp_millis());
        info!("Uploading filtered image to s3://{}/{}", bucket_name, key);

        self.client
            .put_object()
            .bucket(bucket_name)
            .key(&key)
            .body(ByteStream::from(buffer))
            .content_type(JPEG_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| {
                error!("Error uploading image to S3: {:?}", e);
                FilterError::from(e)
            })?;

        let url = public_url(bucket_name, &key);
        info!("Uploaded filtered image: {}", url);

        Ok(url)
    }
}
