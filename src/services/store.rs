//! Remote object store seam.
//!
//! Everything that talks to the object store goes through [`RemoteStore`], so
//! the range reader and presign service can run against S3 in production and
//! against an in-memory store in tests.

use crate::models::{byte_range::ByteRange, object_key::ObjectKey};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("object `{key}` not found")]
    NotFound { key: String },
    #[error("seek to {target} is outside object of {size} bytes")]
    OutOfRange { target: i128, size: u64 },
    #[error("{operation} failed for `{key}`: {message}")]
    Upstream {
        operation: &'static str,
        key: String,
        message: String,
    },
    #[error("`{0}` is not implemented")]
    NotImplemented(&'static str),
    #[error("store returned an invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("object `{key}` ended early at byte {offset}")]
    UnexpectedEof { key: String, offset: u64 },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Minimal read-side view of an object store bucket.
///
/// Implementations are shared by every in-flight request and must not hold
/// per-request state.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Size of the object in bytes.
    async fn head_object(&self, key: &ObjectKey) -> BridgeResult<u64>;

    /// Bytes of the inclusive `range`. One remote call per invocation.
    async fn get_object_range(&self, key: &ObjectKey, range: ByteRange) -> BridgeResult<Bytes>;

    /// A signed GET URL for the object, valid for `expiry`.
    async fn presign_get_url(&self, key: &ObjectKey, expiry: Duration) -> BridgeResult<String>;
}
