//! Symbol name validation.
//!
//! Symbols become path segments in the persistence key space, so the accepted
//! alphabet is deliberately narrow: ASCII letters and digits plus `. - _ ^ = +`
//! (enough for tickers such as `BRK.B`, `^GSPC`, `EURUSD=X`).

use crate::error::{StoreError, StoreResult};

/// Longest accepted symbol, in bytes.
pub const MAX_SYMBOL_LEN: usize = 128;

/// Rejects names that cannot be used as a storage key.
pub fn validate_symbol(symbol: &str) -> StoreResult<()> {
    let reason = if symbol.is_empty() {
        Some("symbol is empty")
    } else if symbol.len() > MAX_SYMBOL_LEN {
        Some("symbol is longer than 128 bytes")
    } else if symbol == "." || symbol == ".." {
        Some("symbol is a relative path component")
    } else if !symbol
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b'^' | b'=' | b'+'))
    {
        Some("symbol contains characters outside [A-Za-z0-9.-_^=+]")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidSymbol {
            symbol: symbol.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
