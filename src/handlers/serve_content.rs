//! Range-aware content serving on top of a [`RangeReader`].
//!
//! Given a read session, answers a request the way a static file server
//! would: full `200` bodies, single-range `206` bodies, `416` for ranges that
//! cannot be satisfied, and header-only `HEAD` responses. Date preconditions
//! (`If-Unmodified-Since`, `If-Modified-Since`, `If-Range`) are checked against
//! the modification time before any byte is fetched. The body is pulled from
//! the store one bounded chunk at a time as the client consumes it.

use crate::{
    errors::AppError,
    models::byte_range::{ByteRange, RangeError, parse_range_header},
    services::{
        range_reader::RangeReader,
        store::{BridgeError, BridgeResult},
    },
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt, stream};
use std::io::SeekFrom;
use tracing::{debug, error, warn};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Serve the object behind `reader`, honouring any `Range` header.
///
/// `name` is used to infer `Content-Type`; `modified` becomes
/// `Last-Modified` and is the validator for conditional requests, compared
/// at whole-second precision. Several ranges in one request are answered
/// with the full object.
pub async fn serve_content(
    method: &Method,
    headers: &HeaderMap,
    name: &str,
    modified: DateTime<Utc>,
    mut reader: RangeReader,
    chunk_size: usize,
) -> Result<Response, AppError> {
    let size = reader
        .seek(SeekFrom::End(0))
        .and_then(|size| reader.seek(SeekFrom::Start(0)).map(|_| size))
        .map_err(seek_failed)?;

    match check_preconditions(method, headers, modified) {
        Precondition::Failed => return Ok(precondition_failed()),
        Precondition::NotModified => return Ok(not_modified(modified)),
        Precondition::Proceed => {}
    }

    let requested = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .filter(|_| range_still_valid(headers, modified));

    let window = match requested.map(|raw| parse_range_header(raw, size)) {
        None => None,
        Some(Ok(ranges)) if ranges.is_empty() => None,
        Some(Ok(ranges)) if ranges.len() == 1 => Some(ranges[0]),
        Some(Ok(ranges)) => {
            debug!(count = ranges.len(), "serving full object for multi-range request");
            None
        }
        // Clients that always send a Range still get an empty object.
        Some(Err(RangeError::NotSatisfiable)) if size == 0 => None,
        Some(Err(err)) => {
            debug!(range = requested.unwrap_or_default(), %err, "rejecting range");
            return Ok(not_satisfiable(size));
        }
    };

    let (status, start, len) = match window {
        Some(range) => (StatusCode::PARTIAL_CONTENT, range.start, range.len()),
        None => (StatusCode::OK, 0, size),
    };
    reader.seek(SeekFrom::Start(start)).map_err(seek_failed)?;

    let body = if *method == Method::HEAD || len == 0 {
        Body::empty()
    } else {
        Body::from_stream(body_stream(reader, len, chunk_size))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let resp_headers = response.headers_mut();
    set_content_headers(resp_headers, name, modified, len);
    if let Some(range) = window {
        set_content_range(resp_headers, range, size);
    }

    Ok(response)
}

enum Precondition {
    Proceed,
    NotModified,
    Failed,
}

/// Evaluate `If-Unmodified-Since` and `If-Modified-Since`.
///
/// Unparsable dates are ignored, as if the header were absent.
fn check_preconditions(
    method: &Method,
    headers: &HeaderMap,
    modified: DateTime<Utc>,
) -> Precondition {
    let modified = modified.timestamp();

    if header_date(headers, &header::IF_UNMODIFIED_SINCE).is_some_and(|since| modified > since) {
        return Precondition::Failed;
    }

    let conditional_read = *method == Method::GET || *method == Method::HEAD;
    if conditional_read
        && !headers.contains_key(header::IF_NONE_MATCH)
        && header_date(headers, &header::IF_MODIFIED_SINCE).is_some_and(|since| modified <= since)
    {
        return Precondition::NotModified;
    }

    Precondition::Proceed
}

/// Whether a `Range` header may be honoured under `If-Range`.
///
/// Only a date equal to the modification time keeps the range. An entity
/// tag never matches because no tags are issued.
fn range_still_valid(headers: &HeaderMap, modified: DateTime<Utc>) -> bool {
    let Some(value) = headers.get(header::IF_RANGE) else {
        return true;
    };
    match value.to_str().ok().and_then(parse_http_date) {
        Some(date) => date == modified.timestamp(),
        None => false,
    }
}

fn header_date(headers: &HeaderMap, name: &header::HeaderName) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}

/// Parse an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) into Unix seconds.
fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.timestamp())
}

/// Pull `len` bytes from the reader, at most `chunk_size` per store call.
///
/// A read that yields nothing before `len` bytes were produced means the
/// object shrank under us; the stream then ends with an error so the client
/// sees a truncated transfer instead of a silently short body.
fn body_stream(
    reader: RangeReader,
    len: u64,
    chunk_size: usize,
) -> impl Stream<Item = BridgeResult<Bytes>> + Send + 'static {
    stream::try_unfold((reader, len), move |(mut reader, remaining)| async move {
        if remaining == 0 {
            return Ok::<_, BridgeError>(None);
        }
        let mut buf = vec![0u8; remaining.min(chunk_size as u64) as usize];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(BridgeError::UnexpectedEof {
                key: reader.key().to_string(),
                offset: reader.position(),
            });
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), (reader, remaining - n as u64))))
    })
    .inspect_err(|err| warn!(error = %err, "aborting object stream"))
}

fn set_content_headers(headers: &mut HeaderMap, name: &str, modified: DateTime<Utc>, len: u64) {
    let content_type = mime_guess::from_path(name).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let Ok(value) = HeaderValue::from_str(&modified.format(HTTP_DATE).to_string()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}

fn set_content_range(headers: &mut HeaderMap, range: ByteRange, size: u64) {
    if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
        headers.insert(header::CONTENT_RANGE, value);
    }
}

fn not_satisfiable(size: u64) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
    let headers = response.headers_mut();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
        headers.insert(header::CONTENT_RANGE, value);
    }
    response
}

fn not_modified(modified: DateTime<Utc>) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    if let Ok(value) = HeaderValue::from_str(&modified.format(HTTP_DATE).to_string()) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }
    response
}

fn precondition_failed() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::PRECONDITION_FAILED;
    response
}

fn seek_failed(err: BridgeError) -> AppError {
    error!(error = %err, "seek failed while preparing response");
    AppError::internal("error accessing asset")
}
