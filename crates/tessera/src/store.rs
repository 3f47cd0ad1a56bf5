//! The transactional object store
//!
//! Provides the only entry points that touch the database:
//! - `view`: isolated snapshot reads, never blocked by writers
//! - `update`: one write transaction under the writer lock
//! - `batch`: many logical updates over bounded physical transactions
//!
//! Committed changes are published on the store's watch queue, each
//! transaction's events in operation order followed by one commit marker.

use crate::batch::Batch;
use crate::read_txn::{ReadTx, ReadTxn};
use crate::transaction::{Tx, Txn};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tessera_bus::WatchQueue;
use tessera_core::{
    observe, DbWrite, Event, EventCommit, IndexedDb, Object, ProposalContext, ProposalError,
    Proposer, Result, StorageResult, StoreConfig, StoreError, StoreEvent, TableSchema, TimedMutex,
    Version,
};
use tessera_memdb::MemDb;

/// Where transaction versions come from
enum Sequencer<E: Event> {
    /// Store-owned counter; holds the version of the next commit
    Local(AtomicU64),

    /// The proposer's log position at transaction start
    Proposer(Arc<dyn Proposer<E>>),
}

impl<E: Event> Sequencer<E> {
    fn current(&self) -> Version {
        match self {
            Sequencer::Local(next) => Version::new(next.load(Ordering::Acquire)),
            Sequencer::Proposer(proposer) => proposer.version(),
        }
    }
}

/// Embedded transactional object store
///
/// Generic over the object type stored in its tables and over the indexed
/// database holding them (an in-memory [`MemDb`] unless stated otherwise).
/// Share it between threads behind an `Arc`.
pub struct Store<O: Object, D: IndexedDb<O> = MemDb<O>> {
    db: D,
    pub(crate) update_lock: TimedMutex,
    queue: WatchQueue<StoreEvent<O::Event>>,
    sequencer: Sequencer<O::Event>,
    proposal_ctx: ProposalContext,
    closed: AtomicBool,
    // Set while the current wedge has already been logged
    wedge_reported: AtomicBool,
    pub(crate) config: StoreConfig,
}

impl<O: Object> Store<O, MemDb<O>> {
    /// Open a store over a fresh in-memory database with the given tables
    pub fn open(
        tables: impl IntoIterator<Item = TableSchema<O>>,
        config: StoreConfig,
    ) -> Result<Self> {
        let db = MemDb::open(tables)?;
        Ok(Self::new(db, config))
    }
}

impl<O: Object, D: IndexedDb<O>> Store<O, D> {
    /// Create a store whose versions come from a local counter starting at 1
    pub fn new(db: D, config: StoreConfig) -> Self {
        tracing::info!("opening store with local sequencer");
        Self::build(db, Sequencer::Local(AtomicU64::new(1)), config)
    }

    /// Create a store that commits only what `proposer` accepts
    pub fn with_proposer(
        db: D,
        proposer: Arc<dyn Proposer<O::Event>>,
        config: StoreConfig,
    ) -> Self {
        tracing::info!("opening store with proposer");
        Self::build(db, Sequencer::Proposer(proposer), config)
    }

    fn build(db: D, sequencer: Sequencer<O::Event>, config: StoreConfig) -> Self {
        Self {
            db,
            update_lock: TimedMutex::new(),
            queue: WatchQueue::with_config(&config.bus),
            sequencer,
            proposal_ctx: ProposalContext::new(),
            closed: AtomicBool::new(false),
            wedge_reported: AtomicBool::new(false),
            config,
        }
    }

    /// Run `f` against a fresh read snapshot
    ///
    /// Never waits for the writer lock; concurrent writes are invisible to
    /// the snapshot.
    pub fn view<R>(&self, f: impl FnOnce(&dyn ReadTxn<O>) -> R) -> R {
        let tx = ReadTx::new(self.db.read_txn());
        f(&tx)
    }

    /// Run `f` in a write transaction and commit it if `f` succeeds
    ///
    /// Blocks until the writer lock is free. If `f` fails, nothing it did
    /// is kept and nothing is published.
    pub fn update<R>(&self, f: impl FnOnce(&mut dyn Txn<O>) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let _guard = self.update_lock.lock();
        self.ensure_open()?;

        let mut tx = self.begin()?;
        match f(&mut tx) {
            Ok(value) => {
                self.commit(tx)?;
                Ok(value)
            }
            Err(err) => {
                tx.abort();
                observe::record_abort("callback");
                Err(err)
            }
        }
    }

    /// Run many logical updates through a [`Batch`]
    ///
    /// The batch commits whenever its transaction grows past the configured
    /// limits and once more when `f` returns `Ok`. Commits made before a
    /// failure are kept.
    pub fn batch<'s, R>(
        &'s self,
        f: impl FnOnce(&mut Batch<'s, O, D>) -> Result<R>,
    ) -> Result<R> {
        self.ensure_open()?;
        let guard = self.update_lock.lock();
        self.ensure_open()?;

        let tx = self.begin()?;
        let mut batch = Batch::new(self, guard, tx);
        let result = f(&mut batch);
        batch.finish(result)
    }

    /// Queue carrying every committed change
    pub fn watch_queue(&self) -> &WatchQueue<StoreEvent<O::Event>> {
        &self.queue
    }

    /// Shut the store down
    ///
    /// Ends every watch feed, cancels any in-flight proposal context and
    /// makes later `update`/`batch` calls fail with [`StoreError::Closed`].
    /// Reads keep working. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.proposal_ctx.cancel();
        self.queue.close();
        tracing::info!("store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether the writer lock has been held longer than the wedge timeout
    ///
    /// Logs a warning once per wedge, however often it is polled.
    pub fn wedged(&self) -> bool {
        match self.update_lock.held_for() {
            Some(held) if held > self.config.wedge_timeout() => {
                if !self.wedge_reported.swap(true, Ordering::AcqRel) {
                    tracing::warn!(held_ms = held.as_millis() as u64, "store writer is wedged");
                }
                true
            }
            _ => {
                self.wedge_reported.store(false, Ordering::Release);
                false
            }
        }
    }

    /// When the current writer acquired the lock, if any
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.update_lock.locked_at()
    }

    /// Version the next write transaction will stamp
    pub fn version(&self) -> Version {
        self.sequencer.current()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Open a write transaction; the caller must hold the writer lock.
    pub(crate) fn begin(&self) -> Result<Tx<O, D::WriteTxn<'_>>> {
        let db_txn = self.db.write_txn()?;
        Ok(Tx::new(db_txn, self.sequencer.current()))
    }

    /// Commit a write transaction and publish its changes; the caller must
    /// hold the writer lock.
    pub(crate) fn commit<'s>(&'s self, tx: Tx<O, D::WriteTxn<'s>>) -> Result<()> {
        let (db_txn, changelist, version) = tx.into_parts();
        if changelist.is_empty() {
            db_txn.commit()?;
            return Ok(());
        }

        let start = Instant::now();
        match &self.sequencer {
            Sequencer::Local(next) => {
                db_txn.commit()?;
                next.store(version.next().index(), Ordering::Release);
            }
            Sequencer::Proposer(proposer) => {
                self.propose(proposer.as_ref(), db_txn, &changelist)?;
            }
        }
        observe::record_commit(start.elapsed(), changelist.len());
        tracing::debug!(%version, changes = changelist.len(), "committed transaction");

        let changelist: Arc<[O::Event]> = changelist.into();
        for event in changelist.iter() {
            self.queue.publish(StoreEvent::Change(event.clone()));
        }
        self.queue
            .publish(StoreEvent::Commit(EventCommit::new(changelist, version)));
        Ok(())
    }

    fn propose<'s>(
        &'s self,
        proposer: &dyn Proposer<O::Event>,
        db_txn: D::WriteTxn<'s>,
        changelist: &[O::Event],
    ) -> Result<()> {
        let start = Instant::now();
        let mut pending = Some(db_txn);
        let mut applied: Option<StorageResult<()>> = None;

        let outcome = proposer.propose_value(&self.proposal_ctx, changelist, &mut || {
            if let Some(db_txn) = pending.take() {
                applied = Some(db_txn.commit());
            }
        });
        observe::record_proposal(start.elapsed(), outcome.is_ok());

        if let Some(db_txn) = pending.take() {
            db_txn.abort();
            observe::record_abort("proposal");
            return match outcome {
                Err(err) => {
                    tracing::warn!(error = %err, "proposal failed, transaction aborted");
                    Err(err.into())
                }
                Ok(()) => {
                    tracing::warn!("proposer accepted without applying, transaction aborted");
                    Err(ProposalError::NotApplied.into())
                }
            };
        }

        if let Some(Err(err)) = applied {
            return Err(err.into());
        }
        if let Err(err) = outcome {
            // The local commit already happened; nothing is published for it
            tracing::warn!(error = %err, "proposer failed after applying the transaction");
            return Err(err.into());
        }
        Ok(())
    }
}
