#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use series_store::backend::BackendError;
use series_store::store::StoreOptions;
use series_store::{FsBackend, KvBackend, Record, Store};
use tempfile::TempDir;

pub const DAY: i64 = 86_400;

/// A daily bar whose prices are all derived from `close`.
pub fn bar(day: i64, close: f64) -> Record {
    Record::new(day * DAY, close - 0.5, close + 1.0, close - 1.0, close, 1_000 * day, close * 0.98)
}

/// Daily bars for `days` with close = base + day.
pub fn bars(days: std::ops::RangeInclusive<i64>, base: f64) -> Vec<Record> {
    days.map(|d| bar(d, base + d as f64)).collect()
}

pub struct TestStore {
    pub dir: TempDir, // keep alive for the life of the test
    pub root: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join("stock_db");
        Self { dir, root }
    }

    pub fn backend(&self) -> Arc<dyn KvBackend> {
        Arc::new(FsBackend::open(&self.root, false).expect("fs backend"))
    }

    /// Opens (or re-opens) a store over the same directory.
    pub fn open(&self) -> Store {
        Store::with_backend(self.backend(), StoreOptions::default()).expect("open store")
    }
}

/// Wraps a backend and, when armed, refuses to write chain pointers.
pub struct FailingCommits {
    inner: Arc<dyn KvBackend>,
    armed: AtomicBool,
}

impl FailingCommits {
    pub fn new(inner: Arc<dyn KvBackend>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self, on: bool) {
        self.armed.store(on, Ordering::SeqCst);
    }
}

impl KvBackend for FailingCommits {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        if self.armed.load(Ordering::SeqCst) && key.ends_with("/chain") {
            return Err(BackendError::Io {
                key: key.to_string(),
                source: io::Error::other("disk full"),
            });
        }
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        self.inner.get(key)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        self.inner.list_keys(prefix)
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.inner.delete(key)
    }
}
