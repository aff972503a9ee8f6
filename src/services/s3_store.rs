//! S3 backend for [`RemoteStore`] built on `aws-sdk-s3`.

use crate::{
    config::AppConfig,
    models::{byte_range::ByteRange, object_key::ObjectKey},
    services::store::{BridgeError, BridgeResult, RemoteStore},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region, http::HttpResponse, timeout::TimeoutConfig},
    error::{DisplayErrorContext, SdkError},
    presigning::PresigningConfig,
};
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// S3 client bound to the configured bucket. Connection pooling lives in the
/// SDK client.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build the client from static credentials.
    ///
    /// Path-style addressing keeps custom endpoints (MinIO, RustFS, Ceph)
    /// working without wildcard DNS.
    pub fn new(cfg: &AppConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version_latest()
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "s3-bridge",
            ))
            .force_path_style(true);

        if let Some(endpoint) = cfg.endpoint.as_deref() {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        debug!(bucket = %cfg.bucket, region = %cfg.region, "created S3 client");

        Self {
            client: Client::from_conf(builder.build()),
            bucket: cfg.bucket.clone(),
        }
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    async fn head_object(&self, key: &ObjectKey) -> BridgeResult<u64> {
        debug!("HEAD {}", key);

        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| classify("HeadObject", key, err))?;

        let size = output.content_length().unwrap_or_default();
        u64::try_from(size).map_err(|_| BridgeError::Upstream {
            operation: "HeadObject",
            key: key.to_string(),
            message: format!("negative content length {}", size),
        })
    }

    async fn get_object_range(&self, key: &ObjectKey, range: ByteRange) -> BridgeResult<Bytes> {
        let header = range.header_value();
        debug!("GET {} ({})", key, header);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .range(header)
            .send()
            .await
            .map_err(|err| classify("GetObject", key, err))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| BridgeError::Upstream {
                operation: "GetObject",
                key: key.to_string(),
                message: err.to_string(),
            })?;

        Ok(body.into_bytes())
    }

    async fn presign_get_url(&self, key: &ObjectKey, expiry: Duration) -> BridgeResult<String> {
        let presigning_config =
            PresigningConfig::expires_in(expiry).map_err(|err| BridgeError::Upstream {
                operation: "PresignGetObject",
                key: key.to_string(),
                message: err.to_string(),
            })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning_config)
            .await
            .map_err(|err| classify("PresignGetObject", key, err))?;

        Ok(presigned.uri().to_string())
    }
}

/// Map an SDK failure onto the bridge error kinds.
///
/// A 404 from the store is `NotFound`; every other failure (network,
/// credentials, throttling) is `Upstream`.
fn classify<E>(
    operation: &'static str,
    key: &ObjectKey,
    err: SdkError<E, HttpResponse>,
) -> BridgeError
where
    E: std::error::Error + 'static,
{
    let status = err.raw_response().map(|resp| resp.status().as_u16());
    if status == Some(404) {
        return BridgeError::NotFound {
            key: key.to_string(),
        };
    }
    BridgeError::Upstream {
        operation,
        key: key.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}
