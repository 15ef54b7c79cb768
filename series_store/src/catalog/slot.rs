//! Per-symbol slot: published chain + writer lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

use crate::error::{StoreError, StoreResult};
use crate::version::ChainEntry;

/// Holds one symbol's published [`ChainEntry`].
pub struct SymbolSlot {
    chain: ArcSwap<ChainEntry>,
    write_lock: Mutex<()>,
    retired: AtomicBool,
}

/// Proof that the caller holds a slot's write lock.
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SymbolSlot {
    pub(crate) fn new(entry: ChainEntry) -> Self {
        Self {
            chain: ArcSwap::from_pointee(entry),
            write_lock: Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// Snapshot of the currently published chain. Lock-free.
    pub fn load(&self) -> Arc<ChainEntry> {
        self.chain.load_full()
    }

    /// Atomically replaces the published chain.
    ///
    /// Callers that mutate history must hold the [`WriteGuard`] from [`lock`](Self::lock).
    pub fn publish(&self, entry: ChainEntry) {
        self.chain.store(Arc::new(entry));
    }

    /// Takes the writer lock, waiting at most `timeout` when one is given.
    ///
    /// A lock poisoned by a panicking writer is recovered: the chain is only
    /// ever replaced wholesale, so a panic cannot leave it half-updated.
    pub fn lock(&self, timeout: Option<Duration>) -> StoreResult<WriteGuard<'_>> {
        let Some(timeout) = timeout else {
            let guard = self.write_lock.lock().unwrap_or_else(|e| {
                tracing::warn!(symbol = %self.load().symbol, "recovering poisoned write lock");
                PoisonError::into_inner(e)
            });
            return Ok(WriteGuard { _guard: guard });
        };

        let start = Instant::now();
        let mut backoff = Duration::from_micros(50);
        loop {
            match self.write_lock.try_lock() {
                Ok(guard) => return Ok(WriteGuard { _guard: guard }),
                Err(TryLockError::Poisoned(e)) => {
                    tracing::warn!(symbol = %self.load().symbol, "recovering poisoned write lock");
                    return Ok(WriteGuard {
                        _guard: e.into_inner(),
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    let waited = start.elapsed();
                    if waited >= timeout {
                        return Err(StoreError::Concurrency {
                            symbol: self.load().symbol.clone(),
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    std::thread::sleep(backoff.min(timeout - waited));
                    backoff = (backoff * 2).min(Duration::from_millis(5));
                }
            }
        }
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// `true` once the slot was detached from the catalog.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contended_lock_times_out() {
        let slot = SymbolSlot::new(ChainEntry::empty("AAPL"));
        let _held = slot.lock(None).unwrap();
        let err = slot.lock(Some(Duration::from_millis(20))).err().unwrap();
        assert!(matches!(err, StoreError::Concurrency { ref symbol, .. } if symbol == "AAPL"));
    }

    #[test]
    fn uncontended_lock_with_timeout_succeeds() {
        let slot = SymbolSlot::new(ChainEntry::empty("AAPL"));
        drop(slot.lock(Some(Duration::from_millis(1))).unwrap());
        assert!(slot.lock(Some(Duration::from_millis(1))).is_ok());
    }
}
