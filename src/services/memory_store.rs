//! In-memory [`RemoteStore`] for tests. Records every range fetch.

use crate::{
    models::{byte_range::ByteRange, object_key::ObjectKey},
    services::store::{BridgeError, BridgeResult, RemoteStore},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<String, Bytes>,
    ranges: Mutex<Vec<ByteRange>>,
    heads: AtomicUsize,
    /// Cap on bytes returned per range fetch, to simulate short reads.
    max_reply: Option<usize>,
    fail_ranges: AtomicBool,
    fail_upstream: bool,
    presign_base: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, data: impl Into<Bytes>) -> Self {
        self.objects.insert(key.to_string(), data.into());
        self
    }

    pub fn with_max_reply(mut self, max: usize) -> Self {
        self.max_reply = Some(max);
        self
    }

    /// Base that presigned URLs are built on.
    pub fn with_presign_base(mut self, base: &str) -> Self {
        self.presign_base = Some(base.to_string());
        self
    }

    /// Every call fails as if the store were unreachable.
    pub fn unreachable(mut self) -> Self {
        self.fail_upstream = true;
        self
    }

    pub fn fail_ranges(&self, fail: bool) {
        self.fail_ranges.store(fail, Ordering::SeqCst);
    }

    pub fn ranges(&self) -> Vec<ByteRange> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn head_calls(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    fn upstream(operation: &'static str, key: &ObjectKey) -> BridgeError {
        BridgeError::Upstream {
            operation,
            key: key.to_string(),
            message: "connection refused (secret-host.internal:9000)".into(),
        }
    }

    fn object(&self, key: &ObjectKey) -> BridgeResult<&Bytes> {
        self.objects
            .get(key.as_str())
            .ok_or_else(|| BridgeError::NotFound {
                key: key.to_string(),
            })
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn head_object(&self, key: &ObjectKey) -> BridgeResult<u64> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream {
            return Err(Self::upstream("HeadObject", key));
        }
        Ok(self.object(key)?.len() as u64)
    }

    async fn get_object_range(&self, key: &ObjectKey, range: ByteRange) -> BridgeResult<Bytes> {
        self.ranges.lock().unwrap().push(range);
        if self.fail_upstream || self.fail_ranges.load(Ordering::SeqCst) {
            return Err(Self::upstream("GetObject", key));
        }
        let data = self.object(key)?;
        let start = range.start as usize;
        let mut end = (range.end as usize + 1).min(data.len());
        if let Some(max) = self.max_reply {
            end = end.min(start + max);
        }
        Ok(data.slice(start..end))
    }

    async fn presign_get_url(&self, key: &ObjectKey, expiry: Duration) -> BridgeResult<String> {
        if self.fail_upstream {
            return Err(Self::upstream("PresignGetObject", key));
        }
        let base = self
            .presign_base
            .as_deref()
            .unwrap_or("https://store.example.com/bucket");
        Ok(format!(
            "{}/{}?X-Amz-Expires={}&X-Amz-Signature=abc123",
            base,
            key,
            expiry.as_secs()
        ))
    }
}
