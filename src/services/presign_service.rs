//! PresignService hands out time-limited GET URLs so clients can fetch
//! objects straight from the store without credentials.

use crate::{
    models::object_key::ObjectKey,
    services::store::{BridgeError, BridgeResult, RemoteStore},
};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Clone)]
pub struct PresignService {
    store: Arc<dyn RemoteStore>,
    expiry: Duration,
}

impl PresignService {
    pub fn new(store: Arc<dyn RemoteStore>, expiry: Duration) -> Self {
        Self { store, expiry }
    }

    /// Signed GET URL for the object at `path`.
    ///
    /// Leading slashes are stripped from `path`. Single attempt, no retry.
    pub async fn request_url(&self, path: &str) -> BridgeResult<Url> {
        let key = ObjectKey::parse(path)?;
        let signed = self.store.presign_get_url(&key, self.expiry).await?;
        debug!(key = %key, expiry = ?self.expiry, "presigned GET url");
        Ok(Url::parse(&signed)?)
    }

    /// Signed upload URL. Writes are not supported yet.
    pub async fn upload_url(&self, _path: &str) -> BridgeResult<Url> {
        Err(BridgeError::NotImplemented("PresignService::upload_url"))
    }
}
