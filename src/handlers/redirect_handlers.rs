//! Presign front end: answers every object path with a redirect to a
//! short-lived signed URL on the store itself.

use super::request_path;
use crate::{errors::AppError, services::bridge_service::BridgeService};
use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Redirect},
};
use tracing::{debug, error};

/// `GET /{*key}`: 307 to a presigned GET URL, or 404 when signing fails.
pub async fn presign_redirect(
    State(service): State<BridgeService>,
    uri: Uri,
) -> Result<impl IntoResponse, AppError> {
    let path = request_path(&uri)?;
    match service.presign.request_url(&path).await {
        Ok(url) => {
            debug!(path = %path, "redirecting to presigned url");
            Ok(Redirect::temporary(url.as_str()))
        }
        Err(err) => {
            error!(path = %path, error = %err, "could not presign url");
            Err(AppError::not_found("not found"))
        }
    }
}

/// `PUT /{*key}`: presigned uploads are not offered yet.
pub async fn presign_upload(
    State(service): State<BridgeService>,
    uri: Uri,
) -> Result<impl IntoResponse, AppError> {
    let path = request_path(&uri)?;
    let url = service.presign.upload_url(&path).await.map_err(|err| {
        debug!(path = %path, error = %err, "upload url requested");
        AppError::not_implemented("uploads are not supported")
    })?;
    Ok(Redirect::temporary(url.as_str()))
}
