//! Core value types shared by the services and handlers.
//!
//! These are plain values: an object key addressing one object in the
//! configured bucket, and inclusive byte ranges used both for remote fetches
//! and for HTTP `Range` / `Content-Range` headers.

pub mod byte_range;
pub mod object_key;
