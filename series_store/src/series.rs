//! The series container: an immutable, timestamp-ordered run of records.
//!
//! A [`Series`] wraps an `Arc<[Record]>`, so cloning is a pointer copy and an
//! old snapshot stays readable for as long as any version holds it. Nothing
//! here mutates in place; [`merge`] always builds a new allocation (or hands
//! back the existing one untouched when there is nothing to merge).
//!
//! Invariant: timestamps are strictly ascending, so there are never two
//! records with the same timestamp.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::Record;

/// Immutable snapshot of one symbol's records.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    records: Arc<[Record]>,
}

/// Counters describing one [`merge_with_stats`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records in the existing snapshot.
    pub existing: usize,
    /// Records supplied by the caller (before dedup within the batch).
    pub incoming: usize,
    /// Existing timestamps replaced by an incoming record.
    pub overwritten: usize,
    /// Timestamps that were not present before.
    pub appended: usize,
    /// Records in the result.
    pub total: usize,
}

impl Series {
    /// A series with no records.
    pub fn empty() -> Self {
        Self {
            records: Arc::from(Vec::new()),
        }
    }

    /// Builds a series from arbitrary input: sorted by timestamp, and when a
    /// timestamp repeats the later element wins.
    pub fn from_records(records: Vec<Record>) -> Self {
        merge(&Series::empty(), &records)
    }

    /// Wraps records the caller has already verified to be strictly ascending.
    pub(crate) fn from_sorted_unchecked(records: Vec<Record>) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self {
            records: Arc::from(records),
        }
    }

    /// The records, ascending by timestamp.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records in timestamp order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Earliest timestamp, if any.
    pub fn first_timestamp(&self) -> Option<i64> {
        self.records.first().map(|r| r.timestamp)
    }

    /// Latest timestamp, if any.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Record stored at exactly `timestamp`.
    pub fn get(&self, timestamp: i64) -> Option<&Record> {
        self.records
            .binary_search_by_key(&timestamp, |r| r.timestamp)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Records with `start <= timestamp <= end`, as a new series.
    ///
    /// An inverted window yields an empty series.
    pub fn range(&self, start: i64, end: i64) -> Series {
        if start > end {
            return Series::empty();
        }
        let lo = self.records.partition_point(|r| r.timestamp < start);
        let hi = self.records.partition_point(|r| r.timestamp <= end);
        if lo == 0 && hi == self.records.len() {
            return self.clone();
        }
        Series::from_sorted_unchecked(self.records[lo..hi].to_vec())
    }

    /// `true` when both values share the same allocation.
    pub fn ptr_eq(&self, other: &Series) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl Default for Series {
    fn default() -> Self {
        Series::empty()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Union of `existing` and `incoming`, ascending by timestamp.
///
/// On a shared timestamp the record from `incoming` replaces the existing one,
/// whatever either value looks like. Inside `incoming`, a later element beats
/// an earlier one with the same timestamp. `incoming` need not be sorted.
pub fn merge(existing: &Series, incoming: &[Record]) -> Series {
    merge_with_stats(existing, incoming).0
}

/// [`merge`] plus counters for logging.
pub fn merge_with_stats(existing: &Series, incoming: &[Record]) -> (Series, MergeStats) {
    let mut stats = MergeStats {
        existing: existing.len(),
        incoming: incoming.len(),
        ..MergeStats::default()
    };

    if incoming.is_empty() {
        stats.total = existing.len();
        return (existing.clone(), stats);
    }

    // Later inserts overwrite earlier ones: that is the last-write-wins rule.
    let mut batch: BTreeMap<i64, Record> = BTreeMap::new();
    for record in incoming {
        batch.insert(record.timestamp, *record);
    }

    let mut out = Vec::with_capacity(existing.len() + batch.len());
    let mut old = existing.records().iter().peekable();
    for (ts, record) in batch {
        while let Some(prev) = old.next_if(|r| r.timestamp < ts) {
            out.push(*prev);
        }
        if old.next_if(|r| r.timestamp == ts).is_some() {
            stats.overwritten += 1;
        } else {
            stats.appended += 1;
        }
        out.push(record);
    }
    out.extend(old.copied());

    stats.total = out.len();
    (Series::from_sorted_unchecked(out), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bar(ts: i64, close: f64) -> Record {
        Record::new(ts, close, close, close, close, 100, close)
    }

    fn closes(s: &Series) -> Vec<(i64, f64)> {
        s.iter().map(|r| (r.timestamp, r.close)).collect()
    }

    #[test]
    fn incoming_overwrites_same_timestamp() {
        let existing = Series::from_records(vec![bar(1, 10.0)]);
        let merged = merge(&existing, &[bar(1, 99.0)]);
        assert_eq!(closes(&merged), vec![(1, 99.0)]);
        // old snapshot is still intact
        assert_eq!(closes(&existing), vec![(1, 10.0)]);
    }

    #[test]
    fn unordered_incoming_is_sorted_and_last_in_batch_wins() {
        let existing = Series::from_records(vec![bar(2, 2.0), bar(4, 4.0)]);
        let merged = merge(&existing, &[bar(5, 5.0), bar(1, 1.0), bar(3, 3.0), bar(5, 55.0)]);
        assert_eq!(
            closes(&merged),
            vec![(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0), (5, 55.0)]
        );
    }

    #[test]
    fn empty_incoming_returns_existing_allocation() {
        let existing = Series::from_records(vec![bar(1, 1.0), bar(2, 2.0)]);
        let (merged, stats) = merge_with_stats(&existing, &[]);
        assert!(merged.ptr_eq(&existing));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.appended + stats.overwritten, 0);
    }

    #[test]
    fn stats_count_overwrites_and_appends() {
        let existing = Series::from_records((1..=5).map(|d| bar(d, d as f64)).collect());
        let incoming: Vec<Record> = (4..=6).map(|d| bar(d, 100.0 + d as f64)).collect();
        let (merged, stats) = merge_with_stats(&existing, &incoming);
        assert_eq!(
            stats,
            MergeStats {
                existing: 5,
                incoming: 3,
                overwritten: 2,
                appended: 1,
                total: 6
            }
        );
        assert_eq!(
            closes(&merged),
            vec![(1, 1.0), (2, 2.0), (3, 3.0), (4, 104.0), (5, 105.0), (6, 106.0)]
        );
    }

    #[test]
    fn range_is_inclusive() {
        let s = Series::from_records((1..=10).map(|d| bar(d, d as f64)).collect());
        let r = s.range(3, 5);
        assert_eq!(r.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert!(s.range(6, 2).is_empty());
        assert!(s.range(0, 100).ptr_eq(&s));
        assert_eq!(s.get(7).map(|r| r.close), Some(7.0));
        assert!(s.get(11).is_none());
    }

    fn records() -> impl Strategy<Value = Vec<Record>> {
        proptest::collection::vec((-50i64..50, -1.0e6f64..1.0e6), 0..40)
            .prop_map(|v| v.into_iter().map(|(ts, c)| bar(ts, c)).collect())
    }

    proptest! {
        #[test]
        fn merge_output_is_strictly_ascending(a in records(), b in records()) {
            let merged = merge(&Series::from_records(a), &b);
            prop_assert!(merged.records().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }

        #[test]
        fn reapplying_same_batch_is_a_noop(a in records(), b in records()) {
            let once = merge(&Series::from_records(a), &b);
            let twice = merge(&once, &b);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn every_incoming_timestamp_carries_the_last_incoming_value(a in records(), b in records()) {
            let merged = merge(&Series::from_records(a.clone()), &b);
            for r in &b {
                let last = b.iter().rev().find(|x| x.timestamp == r.timestamp).unwrap();
                prop_assert_eq!(merged.get(r.timestamp), Some(last));
            }
            for r in &a {
                prop_assert!(merged.get(r.timestamp).is_some());
            }
        }
    }
}
