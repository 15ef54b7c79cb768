//! Version chain: the numbered history of one symbol.
//!
//! A [`ChainEntry`] is the catalog's value for a symbol. It is itself
//! immutable: [`append_version`] and [`prune`] return a *new* entry, which the
//! catalog then publishes with one atomic pointer swap. Readers holding the old
//! entry keep a consistent view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::Metadata;
use crate::series::Series;

/// One numbered, immutable snapshot plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Version {
    /// Per-symbol counter starting at 0.
    pub version_number: u64,
    /// The data.
    pub series: Series,
    /// Metadata supplied with the write that produced this version.
    pub metadata: Metadata,
    /// When the version was created.
    pub created_at: DateTime<Utc>,
}

/// Summary row returned by [`ChainEntry::versions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version number.
    pub version_number: u64,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// Number of records in the snapshot.
    pub rows: usize,
    /// `true` for the newest version.
    pub is_head: bool,
}

/// Catalog entry for one symbol: head version plus retained history.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    /// Symbol this chain belongs to.
    pub symbol: String,
    /// Newest version; `None` until the first write is published.
    pub head: Option<Arc<Version>>,
    /// Older versions still addressable, ascending by version number.
    pub retained: Vec<Arc<Version>>,
}

impl ChainEntry {
    /// An entry with no versions yet.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            head: None,
            retained: Vec::new(),
        }
    }

    /// `true` once at least one version has been published.
    pub fn has_head(&self) -> bool {
        self.head.is_some()
    }

    /// Version number the next append will use.
    pub fn next_version_number(&self) -> u64 {
        self.head.as_ref().map_or(0, |h| h.version_number + 1)
    }

    /// All addressable versions, oldest first, head last.
    pub fn versions(&self) -> Vec<VersionInfo> {
        let head_no = self.head.as_ref().map(|h| h.version_number);
        self.retained
            .iter()
            .chain(self.head.iter())
            .map(|v| VersionInfo {
                version_number: v.version_number,
                created_at: v.created_at,
                rows: v.series.len(),
                is_head: Some(v.version_number) == head_no,
            })
            .collect()
    }

    /// Numbers of the retained (non-head) versions, ascending.
    pub fn retained_numbers(&self) -> Vec<u64> {
        self.retained.iter().map(|v| v.version_number).collect()
    }
}

/// Produces the entry that results from publishing `series` as the new head.
///
/// Returns the new entry and the version numbers it no longer references
/// (non-empty only when `prune_previous` is set and history existed).
pub fn append_version(
    entry: &ChainEntry,
    series: Series,
    metadata: Metadata,
    prune_previous: bool,
    created_at: DateTime<Utc>,
) -> (ChainEntry, Vec<u64>) {
    let head = Arc::new(Version {
        version_number: entry.next_version_number(),
        series,
        metadata,
        created_at,
    });

    let (retained, dropped) = if prune_previous {
        let dropped = entry
            .retained
            .iter()
            .chain(entry.head.iter())
            .map(|v| v.version_number)
            .collect();
        (Vec::new(), dropped)
    } else {
        let mut retained = entry.retained.clone();
        retained.extend(entry.head.iter().cloned());
        (retained, Vec::new())
    };

    (
        ChainEntry {
            symbol: entry.symbol.clone(),
            head: Some(head),
            retained,
        },
        dropped,
    )
}

/// Drops every version except the head. Returns the new entry and the dropped numbers.
pub fn prune(entry: &ChainEntry) -> (ChainEntry, Vec<u64>) {
    let dropped = entry.retained_numbers();
    (
        ChainEntry {
            symbol: entry.symbol.clone(),
            head: entry.head.clone(),
            retained: Vec::new(),
        },
        dropped,
    )
}

/// The newest version.
pub fn read_head(entry: &ChainEntry) -> StoreResult<Arc<Version>> {
    entry
        .head
        .clone()
        .ok_or_else(|| StoreError::NotFound(entry.symbol.clone()))
}

/// A specific version, if it is the head or still retained.
pub fn read_version(entry: &ChainEntry, version_number: u64) -> StoreResult<Arc<Version>> {
    let not_found = || StoreError::VersionNotFound {
        symbol: entry.symbol.clone(),
        version: version_number,
    };

    let head = entry.head.as_ref().ok_or_else(not_found)?;
    if head.version_number == version_number {
        return Ok(head.clone());
    }
    entry
        .retained
        .binary_search_by_key(&version_number, |v| v.version_number)
        .map(|i| entry.retained[i].clone())
        .map_err(|_| not_found())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn series(ts: i64) -> Series {
        Series::from_records(vec![Record::new(ts, 1.0, 1.0, 1.0, 1.0, 1, 1.0)])
    }

    #[test]
    fn first_append_is_version_zero() {
        let entry = ChainEntry::empty("AAPL");
        assert!(matches!(read_head(&entry), Err(StoreError::NotFound(s)) if s == "AAPL"));

        let (entry, dropped) = append_version(&entry, series(1), Metadata::new(), true, at(10));
        assert!(dropped.is_empty());
        assert_eq!(read_head(&entry).unwrap().version_number, 0);
        assert!(entry.retained.is_empty());
    }

    #[test]
    fn retaining_history_keeps_every_version_addressable() {
        let mut entry = ChainEntry::empty("AAPL");
        for i in 0..3 {
            entry = append_version(&entry, series(i), Metadata::new(), false, at(i)).0;
        }
        assert_eq!(entry.retained_numbers(), vec![0, 1]);
        assert_eq!(read_head(&entry).unwrap().version_number, 2);
        assert_eq!(read_version(&entry, 0).unwrap().series.first_timestamp(), Some(0));
        assert_eq!(read_version(&entry, 1).unwrap().version_number, 1);

        let infos = entry.versions();
        assert_eq!(infos.iter().map(|v| v.version_number).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(infos[2].is_head && !infos[0].is_head);
    }

    #[test]
    fn pruning_discards_prior_versions() {
        let entry = ChainEntry::empty("AAPL");
        let (entry, _) = append_version(&entry, series(1), Metadata::new(), false, at(1));
        let (entry, _) = append_version(&entry, series(2), Metadata::new(), false, at(2));
        let (pruned, dropped) = append_version(&entry, series(3), Metadata::new(), true, at(3));

        assert_eq!(dropped, vec![0, 1]);
        assert_eq!(read_head(&pruned).unwrap().version_number, 2);
        assert!(matches!(
            read_version(&pruned, 0),
            Err(StoreError::VersionNotFound { version: 0, .. })
        ));
        // the input entry is untouched
        assert_eq!(read_version(&entry, 0).unwrap().version_number, 0);
    }

    #[test]
    fn explicit_prune_keeps_head_only() {
        let mut entry = ChainEntry::empty("X");
        for i in 0..4 {
            entry = append_version(&entry, series(i), Metadata::new(), false, at(i)).0;
        }
        let (pruned, dropped) = prune(&entry);
        assert_eq!(dropped, vec![0, 1, 2]);
        assert_eq!(pruned.versions().len(), 1);
        assert_eq!(pruned.next_version_number(), 4);
    }

    #[test]
    fn unknown_version_is_version_not_found() {
        let entry = ChainEntry::empty("X");
        assert!(matches!(read_version(&entry, 0), Err(StoreError::VersionNotFound { .. })));
        let (entry, _) = append_version(&entry, series(1), Metadata::new(), false, at(1));
        assert!(matches!(read_version(&entry, 5), Err(StoreError::VersionNotFound { version: 5, .. })));
    }
}
