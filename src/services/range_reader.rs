//! src/services/range_reader.rs
//!
//! RangeReader: a seekable, randomly readable view over one remote object.
//! Each `read` turns into exactly one ranged GET against the store for the
//! window the caller asked for; nothing is read ahead or cached, so memory
//! per session is bounded by the caller's buffer.

use crate::{
    models::{byte_range::ByteRange, object_key::ObjectKey},
    services::store::{BridgeError, BridgeResult, RemoteStore},
};
use std::{io::SeekFrom, sync::Arc};
use tracing::{debug, instrument};

/// Per-request read session over one object.
///
/// The object size is looked up once in [`RangeReader::open`] and never
/// revalidated. The cursor always stays within `0..=size`. A session has a
/// single owner; `read` and `seek` take `&mut self`.
pub struct RangeReader {
    store: Arc<dyn RemoteStore>,
    key: ObjectKey,
    size: u64,
    position: u64,
}

impl RangeReader {
    /// Look up the object size and start a session at position 0.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn open(store: Arc<dyn RemoteStore>, key: ObjectKey) -> BridgeResult<Self> {
        let size = store.head_object(&key).await?;
        debug!(size, "opened range reader");
        Ok(Self {
            store,
            key,
            size,
            position: 0,
        })
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Fill the front of `buf` with bytes starting at the cursor.
    ///
    /// Fetches `min(buf.len(), size - position)` bytes in one range request.
    /// Returns `Ok(0)` at end of object without touching the store. The
    /// cursor moves by the number of bytes actually delivered; on error it
    /// does not move.
    pub async fn read(&mut self, buf: &mut [u8]) -> BridgeResult<usize> {
        let remaining = self.size - self.position;
        let chunk = remaining.min(buf.len() as u64);
        if chunk == 0 {
            return Ok(0);
        }

        let range = ByteRange::from_len(self.position, chunk);
        let bytes = self.store.get_object_range(&self.key, range).await?;

        // never trust the store to honour the window exactly
        let n = bytes.len().min(chunk as usize);
        buf[..n].copy_from_slice(&bytes[..n]);
        if n < chunk as usize {
            debug!(
                key = %self.key,
                requested = chunk,
                received = n,
                "short read from store"
            );
        }

        self.position += n as u64;
        Ok(n)
    }

    /// Move the cursor.
    ///
    /// `End(d)` and `Current(d)` are relative with the usual signs, so
    /// `End(0)` lands on `size`. A target below 0 or past `size` fails with
    /// `OutOfRange` and leaves the cursor where it was.
    pub fn seek(&mut self, pos: SeekFrom) -> BridgeResult<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size) + i128::from(delta),
        };

        if target < 0 || target > i128::from(self.size) {
            return Err(BridgeError::OutOfRange {
                target,
                size: self.size,
            });
        }

        self.position = target as u64;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryStore;

    fn object(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn open(store: &Arc<MemoryStore>, key: &str) -> RangeReader {
        let dyn_store: Arc<dyn RemoteStore> = store.clone();
        RangeReader::open(dyn_store, ObjectKey::parse(key).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_sets_size_and_zero_cursor() {
        let store = Arc::new(MemoryStore::new().with_object("a/b.bin", object(1000)));
        let reader = open(&store, "/a/b.bin").await;
        assert_eq!(reader.size(), 1000);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.key().as_str(), "a/b.bin");
        assert_eq!(store.head_calls(), 1);
    }

    #[tokio::test]
    async fn open_missing_object_is_not_found() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let err = RangeReader::open(store, ObjectKey::parse("nope").unwrap())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn open_upstream_failure_is_passed_through() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new().unreachable());
        let err = RangeReader::open(store, ObjectKey::parse("x").unwrap())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::Upstream { .. }));
    }

    #[tokio::test]
    async fn read_requests_exact_window() {
        let data = object(1000);
        let store = Arc::new(MemoryStore::new().with_object("obj", data.clone()));
        let mut reader = open(&store, "obj").await;

        let mut buf = vec![0u8; 512];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 512);
        assert_eq!(&buf[..], &data[..512]);
        assert_eq!(reader.position(), 512);
        assert_eq!(store.ranges(), vec![ByteRange { start: 0, end: 511 }]);
    }

    #[tokio::test]
    async fn read_is_clamped_at_end_of_object() {
        let data = object(1000);
        let store = Arc::new(MemoryStore::new().with_object("obj", data.clone()));
        let mut reader = open(&store, "obj").await;
        reader.seek(SeekFrom::Start(900)).unwrap();

        let mut buf = vec![0u8; 512];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(n, 100);
        assert_eq!(&buf[..100], &data[900..]);
        assert_eq!(reader.position(), 1000);
        assert_eq!(store.ranges(), vec![ByteRange { start: 900, end: 999 }]);
    }

    #[tokio::test]
    async fn read_at_end_makes_no_remote_call() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(1000)));
        let mut reader = open(&store, "obj").await;

        let mut buf = vec![0u8; 512];
        reader.read(&mut buf).await.unwrap();
        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 1000);

        for size in [0usize, 1, 10, 4096] {
            let mut buf = vec![0u8; size];
            assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
        }
        assert_eq!(store.ranges().len(), 1);
        assert_eq!(reader.position(), 1000);
    }

    #[tokio::test]
    async fn empty_buffer_reads_nothing() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(10)));
        let mut reader = open(&store, "obj").await;
        let mut empty: [u8; 0] = [];
        assert_eq!(reader.read(&mut empty).await.unwrap(), 0);
        assert!(store.ranges().is_empty());
        assert_eq!(reader.position(), 0);
    }

    #[tokio::test]
    async fn short_read_advances_by_delivered_bytes() {
        let data = object(100);
        let store = Arc::new(
            MemoryStore::new()
                .with_object("obj", data.clone())
                .with_max_reply(30),
        );
        let mut reader = open(&store, "obj").await;

        let mut buf = vec![0u8; 50];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 30);
        assert_eq!(reader.position(), 30);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 30);
        assert_eq!(&buf[..30], &data[30..60]);
        assert_eq!(
            store.ranges(),
            vec![
                ByteRange { start: 0, end: 49 },
                ByteRange { start: 30, end: 79 }
            ]
        );
    }

    #[tokio::test]
    async fn failed_read_keeps_cursor() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(100)));
        let mut reader = open(&store, "obj").await;
        reader.seek(SeekFrom::Start(10)).unwrap();

        store.fail_ranges(true);
        let mut buf = vec![0u8; 20];
        let err = reader.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, BridgeError::Upstream { .. }));
        assert_eq!(reader.position(), 10);

        store.fail_ranges(false);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 20);
        assert_eq!(reader.position(), 30);
    }

    #[tokio::test]
    async fn seek_from_start() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(1000)));
        let mut reader = open(&store, "obj").await;

        assert_eq!(reader.seek(SeekFrom::Start(1000)).unwrap(), 1000);
        assert_eq!(reader.seek(SeekFrom::Start(250)).unwrap(), 250);

        let err = reader.seek(SeekFrom::Start(2000)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::OutOfRange {
                target: 2000,
                size: 1000
            }
        ));
        assert_eq!(reader.position(), 250);
    }

    #[tokio::test]
    async fn seek_from_current() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(1000)));
        let mut reader = open(&store, "obj").await;
        reader.seek(SeekFrom::Start(400)).unwrap();

        assert_eq!(reader.seek(SeekFrom::Current(100)).unwrap(), 500);
        assert_eq!(reader.seek(SeekFrom::Current(-500)).unwrap(), 0);

        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
        assert!(reader.seek(SeekFrom::Current(1001)).is_err());
        assert_eq!(reader.position(), 0);
    }

    #[tokio::test]
    async fn seek_from_end() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(1000)));
        let mut reader = open(&store, "obj").await;

        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 1000);
        assert_eq!(reader.seek(SeekFrom::End(-1000)).unwrap(), 0);
        assert_eq!(reader.seek(SeekFrom::End(-10)).unwrap(), 990);

        assert!(reader.seek(SeekFrom::End(1)).is_err());
        assert!(reader.seek(SeekFrom::End(-1001)).is_err());
        assert_eq!(reader.position(), 990);
    }

    #[tokio::test]
    async fn cursor_stays_in_bounds_across_mixed_operations() {
        let store = Arc::new(MemoryStore::new().with_object("obj", object(300)));
        let mut reader = open(&store, "obj").await;
        let mut buf = vec![0u8; 128];

        let moves = [
            SeekFrom::Start(50),
            SeekFrom::Current(400),
            SeekFrom::End(-20),
            SeekFrom::Current(-1000),
            SeekFrom::End(5),
            SeekFrom::Start(301),
        ];
        for pos in moves {
            let _ = reader.seek(pos);
            assert!(reader.position() <= reader.size());
            let _ = reader.read(&mut buf).await.unwrap();
            assert!(reader.position() <= reader.size());
        }
    }
}
