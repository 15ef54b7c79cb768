//! Key-value persistence capability consumed by the store.
//!
//! The store only needs `put`/`get`/`list_keys`/`delete`; which medium sits
//! behind them is up to the implementation. Two are provided:
//! - [`MemoryBackend`]: a `BTreeMap` behind a lock, for tests and throwaway stores.
//! - [`FsBackend`]: one file per key under a root directory.
//!
//! Keys are `/`-separated ASCII paths built by [`crate::layout`].

mod fs;
mod memory;

pub use fs::FsBackend;
pub use memory::MemoryBackend;

use thiserror::Error;

/// Errors raised by a [`KvBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// An I/O operation on `key` failed.
    #[error("I/O error on key {key}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be mapped onto the medium.
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

/// Abstract key-value storage.
///
/// Implementations must make `put` atomic per key: a concurrent or later `get`
/// sees either the previous bytes or the new ones, never a torn write.
pub trait KvBackend: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;

    /// Returns the value under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Every key starting with `prefix`, sorted ascending.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Removes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Pushes buffered state to the medium. No-op by default.
    fn flush(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
