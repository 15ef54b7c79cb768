//! Exponentially weighted averages.
//!
//! Smoothing is recursive and not bias-adjusted: `y[0] = x[0]` and
//! `y[i] = a * x[i] + (1 - a) * y[i - 1]` with `a = 2 / (span + 1)`.

use crate::error::{IndicatorError, IndicatorResult, require_window};

/// Exponential moving average with the given span.
///
/// Errors:
/// - [`IndicatorError::ZeroWindow`] if `span == 0`
pub fn ema(values: &[f64], span: usize) -> IndicatorResult<Vec<f64>> {
    require_window("span", span)?;
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &x in values {
        let y = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out.push(y);
        prev = Some(y);
    }
    Ok(out)
}

/// MACD line, its signal line, and their difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    /// `ema(fast) - ema(slow)`.
    pub macd: Vec<f64>,
    /// `ema(signal)` of the MACD line.
    pub signal: Vec<f64>,
    /// `macd - signal`.
    pub histogram: Vec<f64>,
}

/// Moving average convergence/divergence, conventionally `(12, 26, 9)`.
///
/// Errors:
/// - [`IndicatorError::ZeroWindow`] for any zero span
/// - [`IndicatorError::SpanOrder`] unless `fast < slow`
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> IndicatorResult<Macd> {
    require_window("fast span", fast)?;
    require_window("signal span", signal)?;
    if fast >= slow {
        return Err(IndicatorError::SpanOrder { fast, slow });
    }
    let line: Vec<f64> = ema(values, fast)?
        .into_iter()
        .zip(ema(values, slow)?)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal)?;
    let histogram = line.iter().zip(&signal).map(|(m, s)| m - s).collect();
    Ok(Macd {
        macd: line,
        signal,
        histogram,
    })
}
