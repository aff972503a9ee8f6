//! Services: the remote store seam, its S3 backend, and the two operations
//! built on top of it (range reads and presigned URLs).

pub mod bridge_service;
#[cfg(test)]
pub mod memory_store;
pub mod presign_service;
pub mod range_reader;
pub mod s3_store;
pub mod store;
