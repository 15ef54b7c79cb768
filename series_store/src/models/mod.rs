//! Plain data types stored by the engine.
//!
//! - [`Record`]: one OHLCV bar.
//! - [`Metadata`]: opaque per-version annotations (source, retrieval date, ...).

pub mod metadata;
pub mod record;

pub use metadata::{MetaValue, Metadata};
pub use record::Record;
