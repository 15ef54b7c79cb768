//! Store façade: the public write/read API.
//!
//! ## Write protocol
//! 1. Validate the symbol name and every incoming record (fail fast: nothing
//!    is touched if one record is bad).
//! 2. Take the symbol's write lock.
//! 3. Read the published head (empty series if none) and merge the incoming
//!    records into it, incoming winning on equal timestamps.
//! 4. Build the next [`ChainEntry`] with [`append_version`].
//! 5. Persist the new segment, then the chain pointer (the commit point).
//! 6. Publish the entry with one atomic swap, then delete pruned segments
//!    (still under the lock).
//!
//! A failure in steps 1–5 leaves the previously published head untouched,
//! both in memory and on the backend.
//!
//! ## Reads
//! Reads never lock: they load the published chain and hand out cheap clones
//! of the immutable snapshot. [`Store::read_batch`] reads each symbol on its
//! own, so the batch as a whole is not a point-in-time view.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{KvBackend, MemoryBackend};
use crate::catalog::{Catalog, validate_symbol};
use crate::codec::{decode_version, encode_version, validate_record};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::{self, ChainPointer};
use crate::models::{Metadata, Record};
use crate::series::{Series, merge_with_stats};
use crate::version::{self, ChainEntry, Version, VersionInfo, append_version, read_head, read_version};

/// Runtime knobs of a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Prune flag used by [`Store::write_default`].
    pub default_prune: bool,
    /// Longest a writer waits for a symbol's lock; `None` waits forever.
    pub lock_timeout: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_prune: true,
            lock_timeout: None,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(cfg: &StoreConfig) -> Self {
        Self {
            default_prune: cfg.default_prune,
            lock_timeout: cfg.lock_timeout(),
        }
    }
}

/// One version of one symbol, as returned by reads.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedItem {
    /// Symbol read.
    pub symbol: String,
    /// Version the data belongs to.
    pub version_number: u64,
    /// When that version was written.
    pub created_at: DateTime<Utc>,
    /// The records (shared, immutable).
    pub series: Series,
    /// Metadata stored with the version.
    pub metadata: Metadata,
}

impl VersionedItem {
    fn from_version(symbol: &str, v: &Version) -> Self {
        Self {
            symbol: symbol.to_string(),
            version_number: v.version_number,
            created_at: v.created_at,
            series: v.series.clone(),
            metadata: v.metadata.clone(),
        }
    }

    /// The records, ascending by timestamp.
    pub fn records(&self) -> &[Record] {
        self.series.records()
    }
}

/// Per-symbol outcome of [`Store::read_batch`].
#[derive(Debug)]
pub struct BatchEntry {
    /// Symbol requested.
    pub symbol: String,
    /// Its data, or why it could not be read.
    pub result: StoreResult<VersionedItem>,
}

impl BatchEntry {
    /// `true` if the symbol was read.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    /// Symbol described.
    pub symbol: String,
    /// Records in the head version.
    pub rows: usize,
    /// Earliest timestamp in the head version.
    pub first_timestamp: Option<i64>,
    /// Latest timestamp in the head version.
    pub last_timestamp: Option<i64>,
    /// Head version number.
    pub head_version: u64,
    /// Retained older version numbers, ascending.
    pub retained_versions: Vec<u64>,
    /// When the head version was written.
    pub last_update: DateTime<Utc>,
}

/// Versioned OHLCV store.
///
/// Construct one per process and pass it to whoever needs it; every method
/// takes `&self` and the type is `Send + Sync`.
pub struct Store {
    backend: Arc<dyn KvBackend>,
    catalog: Catalog,
    options: StoreOptions,
}

impl Store {
    /// Opens the store described by `config`, loading every persisted chain.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::with_backend(config.open_backend()?, StoreOptions::from(config))
    }

    /// Opens a store on an existing backend, loading every persisted chain.
    pub fn with_backend(backend: Arc<dyn KvBackend>, options: StoreOptions) -> StoreResult<Self> {
        let store = Self {
            backend,
            catalog: Catalog::new(),
            options,
        };
        store.load_catalog()?;
        Ok(store)
    }

    /// A fresh, empty, volatile store with default options.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            catalog: Catalog::new(),
            options: StoreOptions::default(),
        }
    }

    /// Options in effect.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Flushes the backend and releases the store.
    pub fn close(self) -> StoreResult<()> {
        self.backend.flush()?;
        info!(symbols = self.catalog.list_symbols().len(), "store closed");
        Ok(())
    }

    /// Merges `records` into the latest version of `symbol` and publishes the
    /// result as a new version. Returns the new version number.
    ///
    /// With `prune_previous`, every older version is discarded; otherwise the
    /// previous head joins the retained history.
    ///
    /// Errors:
    /// - [`StoreError::InvalidSymbol`] for names that cannot be stored
    /// - [`StoreError::Validation`] if any record has a non-finite price
    /// - [`StoreError::Concurrency`] if the lock bound elapsed
    /// - [`StoreError::Encode`] / [`StoreError::Backend`] if persisting failed
    pub fn write(
        &self,
        symbol: &str,
        records: &[Record],
        metadata: Metadata,
        prune_previous: bool,
    ) -> StoreResult<u64> {
        validate_symbol(symbol)?;
        for (index, record) in records.iter().enumerate() {
            validate_record(record).map_err(|source| StoreError::Validation { index, source })?;
        }

        let slot = self.catalog.get_or_create(symbol);
        let guard = slot.lock(self.options.lock_timeout)?;
        if slot.is_retired() {
            // The symbol was deleted while we waited; start over on a fresh slot.
            drop(guard);
            return self.write(symbol, records, metadata, prune_previous);
        }

        let current = slot.load();
        let existing = current
            .head
            .as_ref()
            .map(|h| h.series.clone())
            .unwrap_or_default();
        let (merged, stats) = merge_with_stats(&existing, records);
        debug!(
            symbol,
            existing = stats.existing,
            incoming = stats.incoming,
            overwritten = stats.overwritten,
            appended = stats.appended,
            "merged incoming records"
        );

        // Segments keep microseconds; stamp at that precision so a reopened
        // version compares equal to the one handed out before.
        let created_at = Utc::now().trunc_subsecs(6);
        let (next, dropped) = append_version(&current, merged, metadata, prune_previous, created_at);
        let head = read_head(&next)?;
        self.persist_version(symbol, &head)?;
        self.persist_pointer(&next)?;

        slot.publish(next);
        self.delete_segments(symbol, &dropped);
        drop(guard);

        info!(
            symbol,
            version = head.version_number,
            rows = head.series.len(),
            pruned = dropped.len(),
            "published version"
        );
        Ok(head.version_number)
    }

    /// [`write`](Self::write) with empty metadata and the configured default prune flag.
    pub fn write_default(&self, symbol: &str, records: &[Record]) -> StoreResult<u64> {
        self.write(symbol, records, Metadata::new(), self.options.default_prune)
    }

    /// Reads the head (or the given version) of `symbol`.
    ///
    /// Errors:
    /// - [`StoreError::NotFound`] if nothing was ever written for `symbol`
    /// - [`StoreError::VersionNotFound`] if `version` was pruned or never existed
    pub fn read(&self, symbol: &str, version: Option<u64>) -> StoreResult<VersionedItem> {
        let chain = self.published_chain(symbol)?;
        let v = match version {
            None => read_head(&chain)?,
            Some(n) => read_version(&chain, n)?,
        };
        Ok(VersionedItem::from_version(symbol, &v))
    }

    /// Like [`read`](Self::read) but keeps only records with `start <= timestamp <= end`.
    pub fn read_range(
        &self,
        symbol: &str,
        version: Option<u64>,
        start: i64,
        end: i64,
    ) -> StoreResult<VersionedItem> {
        let mut item = self.read(symbol, version)?;
        item.series = item.series.range(start, end);
        Ok(item)
    }

    /// Reads the head of every symbol in `symbols`.
    ///
    /// A symbol that cannot be read yields an entry whose `result` holds the
    /// error; the call itself only fails for an empty request
    /// ([`StoreError::EmptyBatch`]). Entries come back in request order,
    /// duplicates included.
    pub fn read_batch<S: AsRef<str>>(&self, symbols: &[S]) -> StoreResult<Vec<BatchEntry>> {
        if symbols.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        let entries: Vec<BatchEntry> = symbols
            .iter()
            .map(|s| {
                let symbol = s.as_ref();
                BatchEntry {
                    symbol: symbol.to_string(),
                    result: self.read(symbol, None),
                }
            })
            .collect();
        debug!(
            requested = entries.len(),
            failed = entries.iter().filter(|e| !e.is_ok()).count(),
            "batch read"
        );
        Ok(entries)
    }

    /// `true` if at least one version of `symbol` is published.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.catalog.exists(symbol)
    }

    /// Every symbol with a published version.
    pub fn list_symbols(&self) -> BTreeSet<String> {
        self.catalog.list_symbols()
    }

    /// Addressable versions of `symbol`, oldest first.
    pub fn list_versions(&self, symbol: &str) -> StoreResult<Vec<VersionInfo>> {
        Ok(self.published_chain(symbol)?.versions())
    }

    /// Row count, time span, and version bookkeeping for `symbol`.
    pub fn symbol_info(&self, symbol: &str) -> StoreResult<SymbolInfo> {
        let chain = self.published_chain(symbol)?;
        let head = read_head(&chain)?;
        Ok(SymbolInfo {
            symbol: symbol.to_string(),
            rows: head.series.len(),
            first_timestamp: head.series.first_timestamp(),
            last_timestamp: head.series.last_timestamp(),
            head_version: head.version_number,
            retained_versions: chain.retained_numbers(),
            last_update: head.created_at,
        })
    }

    /// Discards every version of `symbol` except the head, without writing data.
    /// Returns the discarded version numbers.
    pub fn prune_previous_versions(&self, symbol: &str) -> StoreResult<Vec<u64>> {
        let slot = self
            .catalog
            .get(symbol)
            .ok_or_else(|| StoreError::NotFound(symbol.to_string()))?;
        let guard = slot.lock(self.options.lock_timeout)?;
        let current = slot.load();
        if !current.has_head() || slot.is_retired() {
            return Err(StoreError::NotFound(symbol.to_string()));
        }

        let (next, dropped) = version::prune(&current);
        if dropped.is_empty() {
            return Ok(dropped);
        }
        self.persist_pointer(&next)?;
        slot.publish(next);
        self.delete_segments(symbol, &dropped);
        drop(guard);

        info!(symbol, pruned = dropped.len(), "pruned previous versions");
        Ok(dropped)
    }

    /// Removes `symbol` and all of its versions. Returns `false` if it did not exist.
    pub fn delete_symbol(&self, symbol: &str) -> StoreResult<bool> {
        let Some(slot) = self.catalog.get(symbol) else {
            return Ok(false);
        };
        let guard = slot.lock(self.options.lock_timeout)?;
        if slot.is_retired() {
            // Someone else deleted it while we waited.
            return Ok(false);
        }
        let current = slot.load();

        // Every segment under the symbol goes, including orphans left by
        // failed writes.
        let numbers: Vec<u64> = self
            .backend
            .list_keys(&layout::symbol_prefix(symbol))?
            .iter()
            .filter_map(|k| layout::parse_version_key(k))
            .map(|(_, n)| n)
            .collect();

        // Dropping the pointer first means a crash mid-delete leaves only
        // unreferenced segments, which `open` collects. Segments go before the
        // slot is detached so a writer on the fresh slot cannot lose its own.
        self.backend.delete(&layout::chain_key(symbol))?;
        self.delete_segments(symbol, &numbers);
        self.catalog.remove(symbol);
        slot.publish(ChainEntry::empty(symbol));
        drop(guard);

        if current.has_head() {
            info!(symbol, versions = numbers.len(), "deleted symbol");
        }
        Ok(current.has_head())
    }

    fn published_chain(&self, symbol: &str) -> StoreResult<Arc<ChainEntry>> {
        self.catalog
            .get(symbol)
            .map(|slot| slot.load())
            .filter(|chain| chain.has_head())
            .ok_or_else(|| StoreError::NotFound(symbol.to_string()))
    }

    fn persist_version(&self, symbol: &str, version: &Version) -> StoreResult<()> {
        let bytes = encode_version(version)?;
        self.backend
            .put(&layout::version_key(symbol, version.version_number), &bytes)?;
        Ok(())
    }

    fn persist_pointer(&self, entry: &ChainEntry) -> StoreResult<()> {
        let head = read_head(entry)?;
        let pointer = ChainPointer {
            head: head.version_number,
            retained: entry.retained_numbers(),
        };
        let bytes = serde_json::to_vec(&pointer).map_err(|e| StoreError::Corrupt {
            symbol: entry.symbol.clone(),
            reason: format!("chain pointer serialization failed: {e}"),
        })?;
        self.backend.put(&layout::chain_key(&entry.symbol), &bytes)?;
        Ok(())
    }

    fn delete_segments(&self, symbol: &str, numbers: &[u64]) {
        for &n in numbers {
            if let Err(e) = self.backend.delete(&layout::version_key(symbol, n)) {
                warn!(symbol, version = n, error = %e, "failed to delete unreferenced segment");
            }
        }
    }

    fn load_catalog(&self) -> StoreResult<()> {
        let keys = self.backend.list_keys(layout::SERIES_PREFIX)?;
        let mut referenced: HashSet<(String, u64)> = HashSet::new();
        let mut skipped: HashSet<&str> = HashSet::new();

        for symbol in keys.iter().filter_map(|k| layout::parse_chain_key(k)) {
            if let Err(e) = validate_symbol(symbol) {
                warn!(symbol, error = %e, "skipping chain with unusable symbol name");
                skipped.insert(symbol);
                continue;
            }
            let entry = self.load_chain(symbol)?;
            let before = referenced.len();
            referenced.extend(
                entry
                    .versions()
                    .into_iter()
                    .map(|v| (symbol.to_string(), v.version_number)),
            );
            debug!(symbol, versions = referenced.len() - before, "loaded chain");
            self.catalog.insert_loaded(entry);
        }

        // Segments no pointer references come from writes that failed before
        // their commit point, or deletes interrupted after it. A skipped
        // chain still owns its segments.
        for (symbol, n) in keys.iter().filter_map(|k| layout::parse_version_key(k)) {
            if !skipped.contains(symbol) && !referenced.contains(&(symbol.to_string(), n)) {
                info!(symbol, version = n, "removing unreferenced segment");
                self.delete_segments(symbol, &[n]);
            }
        }

        info!(symbols = self.catalog.len(), "catalog loaded");
        Ok(())
    }

    fn load_chain(&self, symbol: &str) -> StoreResult<ChainEntry> {
        let corrupt = |reason: String| StoreError::Corrupt {
            symbol: symbol.to_string(),
            reason,
        };

        let bytes = self
            .backend
            .get(&layout::chain_key(symbol))?
            .ok_or_else(|| corrupt("chain pointer vanished during load".into()))?;
        let pointer: ChainPointer = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(format!("unreadable chain pointer: {e}")))?;

        let load = |n: u64| -> StoreResult<Arc<Version>> {
            let bytes = self
                .backend
                .get(&layout::version_key(symbol, n))?
                .ok_or_else(|| corrupt(format!("segment for version {n} is missing")))?;
            let v = decode_version(&bytes)?;
            if v.version_number != n {
                return Err(corrupt(format!(
                    "segment key says version {n}, content says {}",
                    v.version_number
                )));
            }
            Ok(Arc::new(v))
        };

        let mut retained = Vec::with_capacity(pointer.retained.len());
        for &n in &pointer.retained {
            retained.push(load(n)?);
        }
        retained.sort_by_key(|v| v.version_number);
        let head = load(pointer.head)?;

        Ok(ChainEntry {
            symbol: symbol.to_string(),
            head: Some(head),
            retained,
        })
    }
}
