//! Key layout inside a [`KvBackend`](crate::KvBackend).
//!
//! ```text
//! series/{symbol}/chain                      JSON ChainPointer
//! series/{symbol}/versions/{n:020}           codec segment for version n
//! ```
//!
//! Version numbers are zero-padded so lexical key order equals numeric order.
//! The chain pointer is the commit point of a write: a segment that no pointer
//! references is garbage and is ignored on open.

use serde::{Deserialize, Serialize};

/// Prefix shared by every key the store writes.
pub const SERIES_PREFIX: &str = "series/";

const CHAIN_LEAF: &str = "chain";
const VERSIONS_DIR: &str = "versions";

/// Persisted form of a [`ChainEntry`](crate::ChainEntry): which versions are addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPointer {
    /// Head version number.
    pub head: u64,
    /// Retained version numbers, ascending.
    #[serde(default)]
    pub retained: Vec<u64>,
}

/// `series/{symbol}/`
pub fn symbol_prefix(symbol: &str) -> String {
    format!("{SERIES_PREFIX}{symbol}/")
}

/// `series/{symbol}/chain`
pub fn chain_key(symbol: &str) -> String {
    format!("{SERIES_PREFIX}{symbol}/{CHAIN_LEAF}")
}

/// `series/{symbol}/versions/{n:020}`
pub fn version_key(symbol: &str, version_number: u64) -> String {
    format!("{SERIES_PREFIX}{symbol}/{VERSIONS_DIR}/{version_number:020}")
}

/// Extracts the symbol from a chain key; `None` for any other key.
pub fn parse_chain_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(SERIES_PREFIX)?;
    let symbol = rest.strip_suffix(CHAIN_LEAF)?.strip_suffix('/')?;
    (!symbol.is_empty() && !symbol.contains('/')).then_some(symbol)
}

/// Extracts `(symbol, version_number)` from a version key.
pub fn parse_version_key(key: &str) -> Option<(&str, u64)> {
    let rest = key.strip_prefix(SERIES_PREFIX)?;
    let (symbol, tail) = rest.split_once('/')?;
    let number = tail.strip_prefix(VERSIONS_DIR)?.strip_prefix('/')?;
    Some((symbol, number.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        assert_eq!(chain_key("AAPL"), "series/AAPL/chain");
        assert_eq!(version_key("AAPL", 3), "series/AAPL/versions/00000000000000000003");
        assert_eq!(parse_chain_key("series/BRK.B/chain"), Some("BRK.B"));
        assert_eq!(parse_chain_key("series/AAPL/versions/00000000000000000003"), None);
        assert_eq!(parse_chain_key("series//chain"), None);
        assert_eq!(
            parse_version_key("series/AAPL/versions/00000000000000000012"),
            Some(("AAPL", 12))
        );
        assert_eq!(parse_version_key("series/AAPL/chain"), None);
    }

    #[test]
    fn padded_keys_sort_numerically() {
        let mut keys = vec![version_key("X", 10), version_key("X", 9), version_key("X", 100)];
        keys.sort();
        let numbers: Vec<u64> = keys.iter().filter_map(|k| parse_version_key(k)).map(|(_, n)| n).collect();
        assert_eq!(numbers, vec![9, 10, 100]);
    }

    #[test]
    fn pointer_json_tolerates_missing_retained() {
        let p: ChainPointer = serde_json::from_str(r#"{"head":4}"#).unwrap();
        assert_eq!(p, ChainPointer { head: 4, retained: vec![] });
    }
}
