// Single-writer access: one lock owns the ledger; every mutation is
// load-mutate-save on a copy that replaces the live ledger only after it is persisted.

use crate::chain::Block;
use crate::config::LedgerParams;
use crate::error::HandleError;
use crate::state::Ledger;
use crate::storage::SnapshotStore;
use crate::tx::Transaction;
use crate::validator::{validate_ledger, verify_replay};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<Ledger>>,
    store: Option<Arc<SnapshotStore>>,
}

impl LedgerHandle {
    /// In-memory handle with no persistence.
    pub fn new(ledger: Ledger) -> Self {
        LedgerHandle {
            inner: Arc::new(Mutex::new(ledger)),
            store: None,
        }
    }

    /// Load the stored ledger, or start a fresh one with genesis and persist it.
    pub fn open(store: SnapshotStore, params: LedgerParams) -> Result<Self, HandleError> {
        let ledger = match store.load()? {
            Some(ledger) => {
                info!(path = %store.path().display(), blocks = ledger.blocks.len(), "opened ledger");
                ledger
            }
            None => {
                let mut ledger = Ledger::with_params(params);
                ledger.create_genesis()?;
                store.save(&ledger)?;
                info!(path = %store.path().display(), "initialised ledger");
                ledger
            }
        };
        Ok(LedgerHandle {
            inner: Arc::new(Mutex::new(ledger)),
            store: Some(Arc::new(store)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, HandleError> {
        self.inner.lock().map_err(|_| HandleError::Poisoned)
    }

    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> Result<R, HandleError> {
        let guard = self.lock()?;
        Ok(f(&*guard))
    }

    /// Run `f` against a copy; commit and persist only if it succeeds.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Ledger) -> Result<R, HandleError>,
    ) -> Result<R, HandleError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(store) = &self.store {
            store.save(&next)?;
        }
        *guard = next;
        Ok(out)
    }

    pub fn create_genesis(&self) -> Result<Block, HandleError> {
        self.mutate(|ledger| Ok(ledger.create_genesis()?.clone()))
    }

    pub fn submit(&self, transactions: Vec<Transaction>, timestamp: u64) -> Result<Block, HandleError> {
        self.mutate(|ledger| Ok(ledger.append_block(transactions, timestamp)?.clone()))
    }

    /// Deep copy for readers that walk the ledger more than once.
    pub fn snapshot(&self) -> Result<Ledger, HandleError> {
        self.with_ledger(Ledger::clone)
    }

    /// Runs the validator with the lock held for the full scan.
    pub fn validate(&self) -> Result<(), HandleError> {
        self.with_ledger(validate_ledger)?.map_err(HandleError::from)
    }

    pub fn verify_replay(&self) -> Result<(), HandleError> {
        self.with_ledger(verify_replay)?.map_err(HandleError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{build_mint, build_transfer};
    use std::thread;

    #[test]
    fn failed_submit_keeps_previous_ledger() {
        let mut ledger = Ledger::new();
        ledger.create_genesis().unwrap();
        let handle = LedgerHandle::new(ledger);
        let before = handle.snapshot().unwrap();
        let err = handle.submit(vec![build_transfer("W1", "W2", 1.0, 0, "")], 1);
        assert!(matches!(err, Err(HandleError::Ledger(_))));
        assert_eq!(handle.snapshot().unwrap(), before);
    }

    #[test]
    fn concurrent_submits_serialize() {
        let mut ledger = Ledger::new();
        ledger.create_genesis().unwrap();
        let handle = LedgerHandle::new(ledger);
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let h = handle.clone();
                thread::spawn(move || {
                    h.submit(vec![build_mint(&format!("W{i}"), 1.0, 0, "")], 1).unwrap();
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        let snap = handle.snapshot().unwrap();
        assert_eq!(snap.blocks.len(), 5);
        assert!(handle.validate().is_ok());
        assert!(handle.verify_replay().is_ok());
    }

    #[test]
    fn open_creates_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let handle = LedgerHandle::open(SnapshotStore::new(dir.path()).unwrap(), LedgerParams::default()).unwrap();
        handle.submit(vec![build_mint("W1", 3.0, 0, "")], 2).unwrap();
        drop(handle);

        let reopened = LedgerHandle::open(SnapshotStore::new(dir.path()).unwrap(), LedgerParams::default()).unwrap();
        let balance = reopened.with_ledger(|l| l.balance("W1", 0)).unwrap();
        assert_eq!(balance, 3.0);
        assert_eq!(reopened.with_ledger(|l| l.blocks.len()).unwrap(), 2);
    }
}
