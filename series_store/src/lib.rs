//! Versioned storage for OHLCV bar series keyed by symbol.
//!
//! The crate is layered leaf-first:
//! - [`codec`]: fixed-width binary layout for one [`Record`] plus the
//!   checksummed segment format a persisted [`Version`] uses.
//! - [`series`]: the immutable, timestamp-ordered [`Series`] snapshot and the
//!   last-write-wins [`merge`](series::merge).
//! - [`version`]: the per-symbol [`ChainEntry`]: head version plus retained
//!   history, and the pure `append_version`/`read_version` operations.
//! - [`catalog`]: symbol → chain mapping with per-symbol writer locks and
//!   lock-free reads.
//! - [`backend`]: the key-value persistence capability ([`KvBackend`]) with
//!   in-memory and filesystem implementations.
//! - [`store`]: the public façade ([`Store`]): `write`, `read`,
//!   `read_batch` and friends.
//! - [`import`]: CSV/JSON file adapters producing records for `write`.
//!
//! ```no_run
//! use series_store::{Metadata, Record, Store};
//!
//! let store = Store::in_memory();
//! let bars = vec![Record::new(1, 10.0, 11.0, 9.5, 10.5, 1_000, 10.5)];
//! let v = store.write("AAPL", &bars, Metadata::new(), true).expect("write");
//! assert_eq!(v, 0);
//! let item = store.read("AAPL", None).expect("read");
//! assert_eq!(item.series.len(), 1);
//! ```

#![deny(missing_docs)]

pub mod backend;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod import;
pub mod layout;
pub mod models;
pub mod series;
pub mod store;
pub mod version;

pub use backend::{FsBackend, KvBackend, MemoryBackend};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use models::{MetaValue, Metadata, Record};
pub use series::Series;
pub use store::{BatchEntry, Store, SymbolInfo, VersionedItem};
pub use version::{ChainEntry, Version, VersionInfo};
