//! Represents the key of an object inside the configured bucket.

use crate::services::store::{BridgeError, BridgeResult};
use std::fmt;

/// Object key (path-like identifier within the bucket).
///
/// Keys never start with `/`; any leading slashes from the request path are
/// stripped by [`ObjectKey::parse`], so `/foo/bar` and `foo/bar` address the
/// same object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Normalize a request path into an object key.
    ///
    /// Returns `NotFound` when nothing is left after stripping, since no
    /// object can live at the bucket root.
    pub fn parse(path: &str) -> BridgeResult<Self> {
        let key = path.trim_start_matches('/');
        if key.is_empty() {
            return Err(BridgeError::NotFound {
                key: path.to_string(),
            });
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment, used to infer the content type.
    pub fn base_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
