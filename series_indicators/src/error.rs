use thiserror::Error;

/// Result alias for indicator computations.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// Invalid indicator parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    /// A window or span of zero.
    #[error("{name} must be at least 1")]
    ZeroWindow {
        /// Parameter name.
        name: &'static str,
    },
    /// MACD needs a fast span strictly shorter than the slow one.
    #[error("macd fast span ({fast}) must be shorter than slow span ({slow})")]
    SpanOrder {
        /// Fast span.
        fast: usize,
        /// Slow span.
        slow: usize,
    },
    /// Band width multiplier that is negative or not finite.
    #[error("band multiplier must be finite and non-negative, got {0}")]
    BandWidth(String),
}

pub(crate) fn require_window(name: &'static str, window: usize) -> IndicatorResult<()> {
    if window == 0 {
        return Err(IndicatorError::ZeroWindow { name });
    }
    Ok(())
}
