//! Symbol catalog: symbol → version chain.
//!
//! ## Concurrency model
//! - Each symbol owns a [`SymbolSlot`]. The slot's chain lives in an
//!   `ArcSwap<ChainEntry>`: readers do one atomic load and never block, and a
//!   writer publishes a whole new entry with one atomic store. A reader racing
//!   a writer therefore sees either the old head or the new one, never a
//!   half-merged state.
//! - Writers of the same symbol serialize on the slot's `Mutex<()>`, which is
//!   held across the read-head → merge → append → publish sequence.
//! - The symbol map itself sits behind a `RwLock` that is only held long enough
//!   to look up or insert a slot. Writers to different symbols never wait on
//!   each other.

mod slot;
mod symbol;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

pub use slot::{SymbolSlot, WriteGuard};
pub use symbol::{MAX_SYMBOL_LEN, validate_symbol};

use crate::version::ChainEntry;

/// In-memory index of every known symbol.
#[derive(Default)]
pub struct Catalog {
    slots: RwLock<HashMap<String, Arc<SymbolSlot>>>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `symbol`, creating an empty one (no head) on first use.
    ///
    /// Idempotent: every caller for the same symbol gets the same slot.
    pub fn get_or_create(&self, symbol: &str) -> Arc<SymbolSlot> {
        if let Some(slot) = self.get(symbol) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(SymbolSlot::new(ChainEntry::empty(symbol))))
            .clone()
    }

    /// The slot for `symbol`, if one was ever created.
    pub fn get(&self, symbol: &str) -> Option<Arc<SymbolSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned()
    }

    /// `true` if a version has been published for `symbol`.
    ///
    /// A slot created by a write that later failed does not count.
    pub fn exists(&self, symbol: &str) -> bool {
        self.get(symbol).is_some_and(|slot| slot.load().has_head())
    }

    /// Every symbol with at least one published version.
    pub fn list_symbols(&self) -> BTreeSet<String> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, slot)| slot.load().has_head())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Registers a chain rebuilt from persistent storage.
    pub fn insert_loaded(&self, entry: ChainEntry) {
        let symbol = entry.symbol.clone();
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol, Arc::new(SymbolSlot::new(entry)));
    }

    /// Detaches the slot for `symbol` and marks it retired so that writers
    /// still holding it start over with a fresh slot.
    pub fn remove(&self, symbol: &str) -> Option<Arc<SymbolSlot>> {
        let slot = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(symbol)?;
        slot.retire();
        Some(slot)
    }

    /// Number of slots (including ones with no head yet).
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` if no slot exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
