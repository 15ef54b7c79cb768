//! Canonical in-memory representation of one OHLCV bar.

use serde::{Deserialize, Serialize};

/// A single time-series bar for a given timestamp.
///
/// `timestamp` is an epoch integer. The store never interprets the unit
/// (seconds, millis, days ...) but every write for one symbol must use the
/// same one, since merge ordering and dedup compare raw values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Epoch timestamp of the bar.
    pub timestamp: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price during the bar interval.
    pub high: f64,
    /// Lowest price during the bar interval.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Volume traded during the bar interval.
    pub volume: i64,
    /// Close adjusted for splits and dividends.
    pub adjusted_close: f64,
}

impl Record {
    /// Builds a record from its fields in storage order.
    pub const fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
        adjusted_close: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            adjusted_close,
        }
    }

    /// Price fields paired with their names, in storage order.
    pub(crate) fn price_fields(&self) -> [(&'static str, f64); 5] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adjusted_close", self.adjusted_close),
        ]
    }
}
