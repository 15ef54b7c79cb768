//! Technical indicators computed over stored series.
//!
//! Everything here is read-only: inputs are borrowed from a
//! [`Series`](series_store::Series) (or any `&[f64]`), outputs are fresh
//! vectors aligned index-for-index with the input. Nothing is written back
//! to the store.
//!
//! Entrypoints:
//! - Rolling windows: [`sma`], [`rolling_std`], [`bollinger`]
//! - Exponential smoothing: [`ema`], [`macd`]
//! - Everything at once for one symbol: [`IndicatorFrame::compute`]
//!
//! ```
//! use series_indicators::IndicatorFrame;
//! use series_store::{Metadata, Record, Store};
//!
//! let store = Store::in_memory();
//! let bars: Vec<Record> = (0..30)
//!     .map(|d| Record::new(d, 1.0, 1.0, 1.0, 100.0 + d as f64, 10, 100.0))
//!     .collect();
//! store.write("AAPL", &bars, Metadata::new(), true).unwrap();
//!
//! let frame = IndicatorFrame::compute(&store.read("AAPL", None).unwrap().series).unwrap();
//! assert_eq!(frame.len(), 30);
//! assert!(frame.rows()[18].sma_20.is_none());
//! assert!(frame.rows()[19].sma_20.is_some());
//! ```

#![deny(missing_docs)]

mod error;
mod exponential;
mod frame;
mod rolling;

pub use error::{IndicatorError, IndicatorResult};
pub use exponential::{Macd, ema, macd};
pub use frame::{IndicatorFrame, IndicatorRow};
pub use rolling::{Band, bollinger, rolling_std, sma};

use series_store::Series;

/// Close prices of `series`, in timestamp order.
pub fn closes(series: &Series) -> Vec<f64> {
    series.iter().map(|r| r.close).collect()
}
