//! Chunked writes
//!
//! A [`Batch`] runs any number of logical updates while keeping every
//! physical transaction bounded. Once the open transaction reaches
//! `max_changes_per_transaction` changes, or its estimated size reaches
//! three quarters of `max_transaction_bytes`, the batch commits it, lets
//! other writers take the lock, and continues in a fresh transaction.
//!
//! # Example
//!
//! ```
//! # use tessera::prelude::*;
//! # fn load<O: Object>(store: &Store<O>, objects: Vec<O>) -> Result<()> {
//! store.batch(|batch| {
//!     for mut obj in objects {
//!         batch.update(|tx| tx.create("objects", &mut obj))?;
//!     }
//!     Ok(())
//! })
//! # }
//! ```

use crate::store::Store;
use crate::transaction::{Tx, Txn};
use tessera_core::{observe, Event, IndexedDb, Object, Result, StoreError, TimedMutexGuard};
use tessera_memdb::MemDb;

/// Handle passed to the callback of `Store::batch`
pub struct Batch<'s, O: Object, D: IndexedDb<O> + 's = MemDb<O>> {
    store: &'s Store<O, D>,
    // Declared before `guard`: the transaction must go before the lock
    tx: Option<Tx<O, D::WriteTxn<'s>>>,
    guard: Option<TimedMutexGuard<'s>>,
    applied: usize,
    changelist_len: usize,
    size_estimate: usize,
    err: Option<StoreError>,
}

impl<'s, O: Object, D: IndexedDb<O> + 's> Batch<'s, O, D> {
    pub(crate) fn new(
        store: &'s Store<O, D>,
        guard: TimedMutexGuard<'s>,
        tx: Tx<O, D::WriteTxn<'s>>,
    ) -> Self {
        Self {
            store,
            tx: Some(tx),
            guard: Some(guard),
            applied: 0,
            changelist_len: 0,
            size_estimate: 0,
            err: None,
        }
    }

    /// Run one logical update in the batch's open transaction
    ///
    /// Unlike `Store::update` this does not commit by itself. If `f` fails,
    /// the changes made since the last intermediate commit are discarded and
    /// every later call returns the same error without running its callback.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut dyn Txn<O>) -> Result<R>) -> Result<R> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let Some(tx) = self.tx.as_mut() else {
            return Err(StoreError::InvalidState("batch has no open transaction".into()));
        };

        let value = match f(tx) {
            Ok(value) => value,
            Err(err) => {
                self.poison(err.clone());
                return Err(err);
            }
        };

        let changes = tx.changes();
        self.size_estimate += changes[self.changelist_len..]
            .iter()
            .map(Event::size_hint)
            .sum::<usize>();
        self.changelist_len = changes.len();
        self.applied += 1;

        let config = &self.store.config;
        if self.changelist_len >= config.max_changes_per_transaction
            || self.size_estimate >= config.commit_threshold_bytes()
        {
            if let Err(err) = self.rotate() {
                self.poison(err.clone());
                return Err(err);
            }
        }
        Ok(value)
    }

    /// Logical updates that have succeeded so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Changes waiting in the open transaction
    pub fn pending(&self) -> usize {
        self.changelist_len
    }

    /// Commit the open transaction, yield the writer lock, and start over.
    fn rotate(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            self.store.commit(tx)?;
        }
        observe::record_batch_rotation();
        tracing::debug!(
            changes = self.changelist_len,
            bytes = self.size_estimate,
            "batch committed intermediate transaction"
        );
        self.changelist_len = 0;
        self.size_estimate = 0;

        // A plain mutex is not FIFO: the yield gives waiting writers a
        // chance but does not guarantee one gets the lock.
        self.guard = None;
        std::thread::yield_now();
        self.guard = Some(self.store.update_lock.lock());

        self.store.ensure_open()?;
        self.tx = Some(self.store.begin()?);
        Ok(())
    }

    fn poison(&mut self, err: StoreError) {
        if let Some(tx) = self.tx.take() {
            tx.abort();
            observe::record_abort("batch");
        }
        self.changelist_len = 0;
        self.size_estimate = 0;
        self.err = Some(err);
    }

    /// Commit what is left once the top-level callback has returned.
    pub(crate) fn finish<R>(mut self, result: Result<R>) -> Result<R> {
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                self.poison(err.clone());
                return Err(err);
            }
        };
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        if let Some(tx) = self.tx.take() {
            self.store.commit(tx)?;
        }
        Ok(value)
    }
}
