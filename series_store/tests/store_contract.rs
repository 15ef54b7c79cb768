mod common;

use common::{DAY, bar, bars};
use series_store::series::merge;
use series_store::{Metadata, Record, Series, Store, StoreError};

#[test]
fn overwrite_semantics_last_write_wins() {
    let existing = Series::from_records(vec![Record::new(1, 10.0, 10.0, 10.0, 10.0, 5, 10.0)]);
    let merged = merge(&existing, &[Record::new(1, 99.0, 99.0, 99.0, 99.0, 5, 99.0)]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.records()[0].close, 99.0);
}

#[test]
fn versioning_without_pruning_keeps_first_snapshot() {
    let store = Store::in_memory();
    let v0 = store.write("AAPL", &bars(1..=3, 100.0), Metadata::new(), false).unwrap();
    let v1 = store.write("AAPL", &bars(3..=4, 200.0), Metadata::new(), false).unwrap();
    assert_eq!((v0, v1), (0, 1));

    let first = store.read("AAPL", Some(0)).unwrap();
    assert_eq!(first.version_number, 0);
    assert_eq!(first.records(), bars(1..=3, 100.0).as_slice());

    let head = store.read("AAPL", None).unwrap();
    assert_eq!(head.version_number, 1);
    assert_eq!(head.series.len(), 4);
    assert_eq!(head.series.get(3 * DAY).unwrap().close, 203.0);
}

#[test]
fn pruning_makes_old_versions_unreachable() {
    let store = Store::in_memory();
    store.write("AAPL", &bars(1..=3, 100.0), Metadata::new(), true).unwrap();
    store.write("AAPL", &bars(4..=4, 100.0), Metadata::new(), true).unwrap();

    let err = store.read("AAPL", Some(0)).unwrap_err();
    assert!(matches!(err, StoreError::VersionNotFound { ref symbol, version: 0 } if symbol == "AAPL"));
    assert_eq!(store.read("AAPL", None).unwrap().version_number, 1);
    assert_eq!(store.list_versions("AAPL").unwrap().len(), 1);
}

#[test]
fn unknown_symbol_and_out_of_range_version() {
    let store = Store::in_memory();
    assert!(matches!(store.read("NOPE", None), Err(StoreError::NotFound(ref s)) if s == "NOPE"));

    store.write("AAPL", &bars(1..=2, 1.0), Metadata::new(), false).unwrap();
    assert!(matches!(
        store.read("AAPL", Some(42)),
        Err(StoreError::VersionNotFound { version: 42, .. })
    ));
}

#[test]
fn batch_read_reports_missing_symbols_per_item() {
    let store = Store::in_memory();
    store.write("AAPL", &bars(1..=5, 150.0), Metadata::new(), true).unwrap();

    let entries = store.read_batch(&["AAPL", "UNKNOWN"]).unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].symbol, "AAPL");
    let aapl = entries[0].result.as_ref().unwrap();
    assert_eq!(aapl.series.len(), 5);

    assert_eq!(entries[1].symbol, "UNKNOWN");
    assert!(matches!(entries[1].result, Err(StoreError::NotFound(_))));
}

#[test]
fn empty_batch_is_a_request_error() {
    let store = Store::in_memory();
    let none: [&str; 0] = [];
    assert!(matches!(store.read_batch(&none), Err(StoreError::EmptyBatch)));
}

#[test]
fn update_scenario_keeps_six_distinct_days() {
    let store = Store::in_memory();
    let v0 = store.write("AAPL", &bars(1..=5, 100.0), Metadata::new(), true).unwrap();
    assert_eq!(v0, 0);

    // days 4-5 carry different values, day 6 is new
    let update: Vec<Record> = (4..=6).map(|d| bar(d, 500.0 + d as f64)).collect();
    let v1 = store.write("AAPL", &update, Metadata::new(), true).unwrap();
    assert_eq!(v1, 1);

    let head = store.read("AAPL", None).unwrap();
    let ts: Vec<i64> = head.series.iter().map(|r| r.timestamp).collect();
    assert_eq!(ts, (1..=6).map(|d| d * DAY).collect::<Vec<_>>());

    for d in 1..=3 {
        assert_eq!(head.series.get(d * DAY).unwrap().close, 100.0 + d as f64);
    }
    for d in 4..=6 {
        assert_eq!(head.series.get(d * DAY).unwrap(), &bar(d, 500.0 + d as f64));
    }
}

#[test]
fn rewriting_the_same_batch_does_not_change_data() {
    let store = Store::in_memory();
    let batch = bars(1..=10, 50.0);
    store.write("MSFT", &batch, Metadata::new(), false).unwrap();
    store.write("MSFT", &batch[7..], Metadata::new(), false).unwrap();

    let v0 = store.read("MSFT", Some(0)).unwrap();
    let v1 = store.read("MSFT", Some(1)).unwrap();
    assert_eq!(v0.series, v1.series);
}

#[test]
fn metadata_travels_with_its_version() {
    let store = Store::in_memory();
    let when = chrono::Utc::now();
    let md = Metadata::new()
        .with("source", "Yahoo Finance")
        .with("retrieval_date", when);
    store.write("NVDA", &bars(1..=2, 1.0), md.clone(), false).unwrap();
    store.write("NVDA", &bars(3..=3, 1.0), Metadata::new(), false).unwrap();

    assert_eq!(store.read("NVDA", Some(0)).unwrap().metadata, md);
    assert!(store.read("NVDA", None).unwrap().metadata.is_empty());
}

#[test]
fn range_read_is_inclusive_window() {
    let store = Store::in_memory();
    store.write("TSLA", &bars(1..=10, 1.0), Metadata::new(), true).unwrap();
    let item = store.read_range("TSLA", None, 3 * DAY, 6 * DAY).unwrap();
    let days: Vec<i64> = item.series.iter().map(|r| r.timestamp / DAY).collect();
    assert_eq!(days, vec![3, 4, 5, 6]);
    assert_eq!(item.version_number, 0);
}

#[test]
fn explicit_prune_and_delete() {
    let store = Store::in_memory();
    for i in 0..3 {
        store.write("GOOG", &bars(i..=i, 1.0), Metadata::new(), false).unwrap();
    }
    assert_eq!(store.prune_previous_versions("GOOG").unwrap(), vec![0, 1]);
    assert!(store.prune_previous_versions("GOOG").unwrap().is_empty());
    assert_eq!(store.symbol_info("GOOG").unwrap().head_version, 2);

    assert!(store.delete_symbol("GOOG").unwrap());
    assert!(!store.delete_symbol("GOOG").unwrap());
    assert!(!store.has_symbol("GOOG"));
    assert!(matches!(store.read("GOOG", None), Err(StoreError::NotFound(_))));

    // writing again starts a fresh chain
    assert_eq!(store.write("GOOG", &bars(1..=1, 1.0), Metadata::new(), true).unwrap(), 0);
}

#[test]
fn list_symbols_only_includes_written_ones() {
    let store = Store::in_memory();
    for s in ["AAPL", "NVDA", "TSLA"] {
        store.write(s, &bars(1..=1, 1.0), Metadata::new(), true).unwrap();
    }
    let mut bad = bar(1, 1.0);
    bad.close = f64::NAN;
    assert!(store.write("MSFT", &[bad], Metadata::new(), true).is_err());

    let symbols: Vec<String> = store.list_symbols().into_iter().collect();
    assert_eq!(symbols, vec!["AAPL", "NVDA", "TSLA"]);
}
