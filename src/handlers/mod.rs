//! HTTP handlers for the two front ends.

pub mod redirect_handlers;
pub mod serve_content;
pub mod stream_handlers;

use crate::errors::AppError;
use axum::http::Uri;
use percent_encoding::percent_decode_str;
use tracing::debug;

/// Decoded request path, still carrying its leading slash.
fn request_path(uri: &Uri) -> Result<String, AppError> {
    percent_decode_str(uri.path())
        .decode_utf8()
        .map(|path| path.into_owned())
        .map_err(|err| {
            debug!(path = uri.path(), %err, "request path is not valid UTF-8");
            AppError::not_found("not found")
        })
}
