//! Error taxonomy for the store.
//!
//! Each layer owns its error type ([`EncodeError`], [`DecodeError`],
//! [`BackendError`]); [`StoreError`] is what the façade hands back to callers.
//! Nothing is retried here: retry policy belongs to whoever drives the store.

use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::{DecodeError, EncodeError};

/// Result alias used throughout the façade.
pub type StoreResult<T> = Result<T, StoreError>;

/// The unified error type returned by [`Store`](crate::Store) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An incoming record was rejected before any mutation happened.
    #[error("record {index} rejected: {source}")]
    Validation {
        /// Position of the offending record in the caller's slice.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: EncodeError,
    },

    /// The symbol name cannot be used as a storage key.
    #[error("invalid symbol {symbol:?}: {reason}")]
    InvalidSymbol {
        /// The rejected name.
        symbol: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// No data has ever been written for the symbol.
    #[error("symbol not found: {0}")]
    NotFound(String),

    /// The symbol exists but the requested version was pruned or never existed.
    #[error("version {version} of {symbol} not found")]
    VersionNotFound {
        /// Symbol that was queried.
        symbol: String,
        /// Requested version number.
        version: u64,
    },

    /// A value could not be encoded into the storage layout.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Stored bytes could not be decoded (corruption or format skew).
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Stored state is inconsistent with itself (e.g. a chain pointer naming a missing segment).
    #[error("corrupt store state for {symbol}: {reason}")]
    Corrupt {
        /// Symbol whose state is inconsistent.
        symbol: String,
        /// Description of the inconsistency.
        reason: String,
    },

    /// The persistence backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The per-symbol write lock was not acquired within the configured bound.
    #[error("timed out after {waited_ms} ms waiting for the write lock on {symbol}")]
    Concurrency {
        /// Symbol whose lock was contended.
        symbol: String,
        /// How long the writer waited.
        waited_ms: u64,
    },

    /// `read_batch` was called without any symbol.
    #[error("batch request contains no symbols")]
    EmptyBatch,

    /// Store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}
