//! Streaming front end: proxies object bytes through a range-aware reader so
//! large objects are never held in memory.

use super::{request_path, serve_content::serve_content};
use crate::{
    errors::AppError,
    services::{bridge_service::BridgeService, store::BridgeError},
};
use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use chrono::Utc;
use tracing::{debug, error};

/// `GET|HEAD /{*key}`: object bytes with `Range` support.
///
/// Missing objects are 404; any other failure while opening the object is
/// a generic 500.
pub async fn stream_object(
    State(service): State<BridgeService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = request_path(&uri)?;

    let reader = match service.open_reader(&path).await {
        Ok(reader) => reader,
        Err(BridgeError::NotFound { key }) => {
            debug!(key = %key, "object not found");
            return Err(AppError::not_found("not found"));
        }
        Err(err) => {
            error!(path = %path, error = %err, "error accessing asset");
            return Err(AppError::internal("error accessing asset"));
        }
    };

    debug!(key = %reader.key(), size = reader.size(), "streaming object");
    let name = reader.key().base_name().to_string();
    serve_content(
        &method,
        &headers,
        &name,
        Utc::now(),
        reader,
        service.read_chunk_size,
    )
    .await
}
