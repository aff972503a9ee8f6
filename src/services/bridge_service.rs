//! BridgeService is the state shared by both HTTP front ends.

use crate::{
    models::object_key::ObjectKey,
    services::{
        presign_service::PresignService,
        range_reader::RangeReader,
        store::{BridgeResult, RemoteStore},
    },
};
use std::{sync::Arc, time::Duration};

/// Cheap to clone; every clone shares the same store client.
#[derive(Clone)]
pub struct BridgeService {
    pub store: Arc<dyn RemoteStore>,
    pub presign: PresignService,
    /// Upper bound on the buffer handed to each `RangeReader::read` while
    /// streaming a response body.
    pub read_chunk_size: usize,
}

impl BridgeService {
    pub fn new(store: Arc<dyn RemoteStore>, expiry: Duration, read_chunk_size: usize) -> Self {
        Self {
            presign: PresignService::new(store.clone(), expiry),
            store,
            read_chunk_size,
        }
    }

    /// Start a read session for the object at request path `path`.
    pub async fn open_reader(&self, path: &str) -> BridgeResult<RangeReader> {
        let key = ObjectKey::parse(path)?;
        RangeReader::open(self.store.clone(), key).await
    }
}
