//! The standard per-symbol indicator table.

use series_store::Series;

use crate::error::IndicatorResult;
use crate::{bollinger, closes, ema, macd};

const BAND_WINDOW: usize = 20;
const BAND_WIDTH: f64 = 2.0;
const FAST_SPAN: usize = 12;
const SLOW_SPAN: usize = 26;
const SIGNAL_SPAN: usize = 9;

/// Indicator values at one timestamp. Windowed columns are `None` until the
/// window fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    /// Bar timestamp.
    pub timestamp: i64,
    /// Close price the row was computed from.
    pub close: f64,
    /// 20-bar simple moving average of the close.
    pub sma_20: Option<f64>,
    /// `sma_20 + 2 * std_20`.
    pub upper_band: Option<f64>,
    /// `sma_20 - 2 * std_20`.
    pub lower_band: Option<f64>,
    /// 12-span EMA of the close.
    pub ema_12: f64,
    /// 26-span EMA of the close.
    pub ema_26: f64,
    /// `ema_12 - ema_26`.
    pub macd: f64,
    /// 9-span EMA of `macd`.
    pub signal_line: f64,
}

/// Bollinger(20, 2) and MACD(12, 26, 9) for every bar of a series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    /// Computes every column from the series' close prices.
    pub fn compute(series: &Series) -> IndicatorResult<Self> {
        let close = closes(series);
        let bands = bollinger(&close, BAND_WINDOW, BAND_WIDTH)?;
        let fast = ema(&close, FAST_SPAN)?;
        let slow = ema(&close, SLOW_SPAN)?;
        let m = macd(&close, FAST_SPAN, SLOW_SPAN, SIGNAL_SPAN)?;

        let rows = series
            .iter()
            .enumerate()
            .map(|(i, r)| IndicatorRow {
                timestamp: r.timestamp,
                close: r.close,
                sma_20: bands[i].map(|b| b.middle),
                upper_band: bands[i].map(|b| b.upper),
                lower_band: bands[i].map(|b| b.lower),
                ema_12: fast[i],
                ema_26: slow[i],
                macd: m.macd[i],
                signal_line: m.signal[i],
            })
            .collect();
        Ok(Self { rows })
    }

    /// Rows in timestamp order.
    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    /// Row for `timestamp`, if the series had a bar there.
    pub fn at(&self, timestamp: i64) -> Option<&IndicatorRow> {
        self.rows
            .binary_search_by_key(&timestamp, |r| r.timestamp)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` for an empty series.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
