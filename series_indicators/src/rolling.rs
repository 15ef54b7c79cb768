//! Fixed-width trailing windows.
//!
//! Output index `i` covers inputs `i + 1 - window ..= i`; it is `None` until
//! the first full window.

use crate::error::{IndicatorError, IndicatorResult, require_window};

/// Simple moving average.
///
/// Errors:
/// - [`IndicatorError::ZeroWindow`] if `window == 0`
pub fn sma(values: &[f64], window: usize) -> IndicatorResult<Vec<Option<f64>>> {
    require_window("window", window)?;
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }
    Ok(out)
}

/// Sample standard deviation (n - 1 denominator) over a trailing window.
///
/// A one-wide window has no sample deviation, so every entry is `None`.
///
/// Errors:
/// - [`IndicatorError::ZeroWindow`] if `window == 0`
pub fn rolling_std(values: &[f64], window: usize) -> IndicatorResult<Vec<Option<f64>>> {
    require_window("window", window)?;
    Ok((0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let w = &values[i + 1 - window..=i];
            let mean = w.iter().sum::<f64>() / window as f64;
            let ss: f64 = w.iter().map(|x| (x - mean).powi(2)).sum();
            Some((ss / (window - 1) as f64).sqrt())
        })
        .collect())
}

/// One point of a Bollinger band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Moving average.
    pub middle: f64,
    /// `middle + k * std`.
    pub upper: f64,
    /// `middle - k * std`.
    pub lower: f64,
}

/// Bollinger bands: the `window` SMA plus and minus `k` sample deviations.
///
/// Errors:
/// - [`IndicatorError::ZeroWindow`] if `window == 0`
/// - [`IndicatorError::BandWidth`] if `k` is negative or not finite
pub fn bollinger(values: &[f64], window: usize, k: f64) -> IndicatorResult<Vec<Option<Band>>> {
    if !k.is_finite() || k < 0.0 {
        return Err(IndicatorError::BandWidth(k.to_string()));
    }
    let mid = sma(values, window)?;
    let dev = rolling_std(values, window)?;
    Ok(mid
        .into_iter()
        .zip(dev)
        .map(|(m, s)| {
            let (middle, s) = (m?, s?);
            Some(Band {
                middle,
                upper: middle + k * s,
                lower: middle - k * s,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sma_fills_after_first_full_window() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(sma(&[1.0, 2.0], 3).unwrap(), vec![None, None]);
        assert!(sma(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn zero_window_is_rejected() {
        assert_eq!(sma(&[1.0], 0), Err(IndicatorError::ZeroWindow { name: "window" }));
        assert!(rolling_std(&[1.0], 0).is_err());
    }

    #[test]
    fn std_uses_sample_denominator() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = rolling_std(&xs, xs.len()).unwrap();
        // population std is 2.0; the sample std is sqrt(32 / 7)
        assert!(close(out[7].unwrap(), (32.0f64 / 7.0).sqrt()));
        assert!(out[..7].iter().all(Option::is_none));
        assert!(rolling_std(&xs, 1).unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn bands_are_symmetric_about_the_average() {
        let xs: Vec<f64> = (0..40).map(|i| (i as f64 * 0.7).sin() * 10.0 + 100.0).collect();
        let bands = bollinger(&xs, 20, 2.0).unwrap();
        assert!(bands[..19].iter().all(Option::is_none));
        for b in bands[19..].iter().map(|b| b.unwrap()) {
            assert!(close(b.upper - b.middle, b.middle - b.lower));
            assert!(b.upper >= b.lower);
        }
        assert!(matches!(bollinger(&xs, 20, -1.0), Err(IndicatorError::BandWidth(_))));
    }

    proptest! {
        #[test]
        fn constant_input_has_flat_average_and_zero_spread(v in -1e6f64..1e6, n in 1usize..60, w in 2usize..10) {
            let xs = vec![v; n];
            for (m, s) in sma(&xs, w).unwrap().into_iter().zip(rolling_std(&xs, w).unwrap()) {
                if let (Some(m), Some(s)) = (m, s) {
                    prop_assert!((m - v).abs() <= 1e-6 * v.abs().max(1.0));
                    prop_assert!(s.abs() <= 1e-6 * v.abs().max(1.0));
                }
            }
        }
    }
}
