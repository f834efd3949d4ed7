use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::error::{sdk_message, Error, Result};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Upload through a presigned PUT URL that stays valid for `expires_in`.
    async fn put_object_presigned(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<()>;
}

pub struct S3Store {
    client: Client,
    http: reqwest::Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
        }
    }

    /// Issue a credential-free URL permitting one PUT of `key`.
    ///
    /// The content type is part of the signature, so the uploader must send
    /// the same `Content-Type` header.
    pub async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Storage(format!("Invalid presign expiry: {}", e)))?;
        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| Error::Storage(sdk_message(e)))?;
        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage(sdk_message(e)))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("Failed to read s3://{}/{}: {}", bucket, key, e)))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Error::Storage(sdk_message(e)))?;
        Ok(())
    }

    async fn put_object_presigned(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<()> {
        let url = self.presign_put(bucket, key, content_type, expires_in).await?;

        let resp = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Presigned upload of {} failed: {} - {}",
                key, status, text
            )));
        }
        Ok(())
    }
}
