//! Routers for the two listeners.
//!
//! ## Structure
//! - **Presign service**
//!   - `GET /{*key}` : 307 redirect to a presigned URL (404 on failure)
//!   - `PUT /{*key}` : 501, uploads are not offered
//!
//! - **Streaming proxy**
//!   - `GET /{*key}` : object bytes, honouring `Range`
//!   - `HEAD /{*key}` : headers only
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`. The
//! bare `/` route is registered too so that it reaches the handlers and gets
//! the same not-found answer as any other missing key.

use crate::{
    handlers::{
        redirect_handlers::{presign_redirect, presign_upload},
        stream_handlers::stream_object,
    },
    services::bridge_service::BridgeService,
};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Router for the presigned-redirect listener.
pub fn presign_routes() -> Router<BridgeService> {
    let object = get(presign_redirect).put(presign_upload);
    Router::new()
        .route("/", object.clone())
        .route("/{*key}", object)
        .layer(TraceLayer::new_for_http())
}

/// Router for the streaming proxy listener. `get` also answers `HEAD`.
pub fn proxy_routes() -> Router<BridgeService> {
    Router::new()
        .route("/", get(stream_object))
        .route("/{*key}", get(stream_object))
        .layer(TraceLayer::new_for_http())
}
