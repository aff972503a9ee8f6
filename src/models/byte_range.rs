//! Inclusive byte ranges and HTTP `Range` header parsing.

use thiserror::Error;

/// An inclusive byte window `[start, end]` of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Range of `len` bytes beginning at `start`. `len` must be non-zero.
    pub fn from_len(start: u64, len: u64) -> Self {
        debug_assert!(len > 0, "byte ranges are never empty");
        Self {
            start,
            end: start + len - 1,
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for a `Range` request header, e.g. `bytes=0-511`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// Value for a `Content-Range` response header.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Why a `Range` header cannot be honoured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed range header")]
    Malformed,
    #[error("no requested range overlaps the object")]
    NotSatisfiable,
}

/// Parse an HTTP `Range` header against an object of `size` bytes.
///
/// Accepts the `bytes` unit with comma-separated `a-b`, `a-` and `-n`
/// specs. Ends are clamped to the last byte; specs starting at or past the
/// end are dropped. An empty result means the header was blank.
pub fn parse_range_header(value: &str, size: u64) -> Result<Vec<ByteRange>, RangeError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }
    let specs = value.strip_prefix("bytes=").ok_or(RangeError::Malformed)?;

    let mut ranges = Vec::new();
    let mut skipped = false;
    for spec in specs.split(',').map(str::trim) {
        if spec.is_empty() {
            continue;
        }
        let (first, last) = spec.split_once('-').ok_or(RangeError::Malformed)?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            // suffix form: the final `n` bytes
            let suffix = parse_pos(last)?;
            if suffix == 0 || size == 0 {
                skipped = true;
                continue;
            }
            let len = suffix.min(size);
            ranges.push(ByteRange::from_len(size - len, len));
            continue;
        }

        let start = parse_pos(first)?;
        let end = if last.is_empty() {
            size.saturating_sub(1)
        } else {
            let end = parse_pos(last)?;
            if start > end {
                return Err(RangeError::Malformed);
            }
            end.min(size.saturating_sub(1))
        };
        if start >= size {
            skipped = true;
            continue;
        }
        ranges.push(ByteRange { start, end });
    }

    if ranges.is_empty() && skipped {
        return Err(RangeError::NotSatisfiable);
    }
    if ranges.is_empty() {
        return Err(RangeError::Malformed);
    }
    Ok(ranges)
}

fn parse_pos(raw: &str) -> Result<u64, RangeError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }
    raw.parse().map_err(|_| RangeError::Malformed)
}
