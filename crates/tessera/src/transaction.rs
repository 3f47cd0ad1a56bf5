//! Write transactions
//!
//! Every mutation is validated against the transaction's own view of the
//! database (which includes its earlier writes), stores a private copy of
//! the caller's object stamped with the transaction version, and appends
//! one event to the changelist published on commit.

use crate::by::By;
use crate::read_txn::{self, ReadTxn};
use std::marker::PhantomData;
use std::sync::Arc;
use tessera_core::{DbWrite, Object, Result, StoreError, Version, ID_INDEX};

/// Read-write access to the store inside `Store::update` or `Batch::update`.
pub trait Txn<O: Object>: ReadTxn<O> {
    /// Insert a new object.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if `obj`'s id is taken. On
    /// success `obj` carries the version it was stored with.
    fn create(&mut self, table: &str, obj: &mut O) -> Result<()>;

    /// Replace a stored object.
    ///
    /// Fails with [`StoreError::NotFound`] if nothing is stored under `obj`'s
    /// id, and with [`StoreError::SequenceConflict`] if the stored version
    /// differs from `obj.version()`. On success `obj` carries its new version.
    fn update(&mut self, table: &str, obj: &mut O) -> Result<()>;

    /// Remove a stored object; fails with [`StoreError::NotFound`] if absent.
    fn delete(&mut self, table: &str, id: &str) -> Result<()>;

    /// Events recorded so far, in operation order
    fn changes(&self) -> &[O::Event];

    /// Version stamped onto every object written by this transaction
    fn version(&self) -> Version;

    fn as_read(&self) -> &dyn ReadTxn<O>;
}

/// A write transaction bound to one database write handle
pub struct Tx<O: Object, W> {
    db_txn: W,
    changelist: Vec<O::Event>,
    version: Version,
    _object: PhantomData<fn() -> O>,
}

impl<O: Object, W: DbWrite<O>> Tx<O, W> {
    pub(crate) fn new(db_txn: W, version: Version) -> Self {
        Self {
            db_txn,
            changelist: Vec::new(),
            version,
            _object: PhantomData,
        }
    }

    pub(crate) fn into_parts(self) -> (W, Vec<O::Event>, Version) {
        (self.db_txn, self.changelist, self.version)
    }

    pub(crate) fn abort(self) {
        self.db_txn.abort();
    }

    fn stored(&self, table: &str, id: &str) -> Result<Option<Arc<O>>> {
        Ok(self.db_txn.first(table, ID_INDEX, id)?)
    }

    fn stamped_copy(&self, obj: &O) -> O {
        let mut copy = obj.clone();
        copy.set_version(self.version);
        copy
    }
}

impl<O: Object, W: DbWrite<O>> ReadTxn<O> for Tx<O, W> {
    fn lookup(&self, table: &str, index: &str, key: &str) -> Option<Arc<O>> {
        read_txn::lookup(&self.db_txn, table, index, key)
    }

    fn get(&self, table: &str, id: &str) -> Option<O> {
        read_txn::get(&self.db_txn, table, id)
    }

    fn find(&self, table: &str, by: &By, on_match: &mut dyn FnMut(Arc<O>)) -> Result<()> {
        read_txn::find(&self.db_txn, table, by, on_match)
    }
}

impl<O: Object, W: DbWrite<O>> Txn<O> for Tx<O, W> {
    fn create(&mut self, table: &str, obj: &mut O) -> Result<()> {
        if self.stored(table, obj.id())?.is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let copy = self.stamped_copy(obj);
        let event = copy.event_create();
        self.db_txn.insert(table, copy)?;
        self.changelist.push(event);
        obj.set_version(self.version);
        Ok(())
    }

    fn update(&mut self, table: &str, obj: &mut O) -> Result<()> {
        let old = self
            .stored(table, obj.id())?
            .ok_or(StoreError::NotFound)?;
        if old.version() != obj.version() {
            return Err(StoreError::SequenceConflict);
        }

        let copy = self.stamped_copy(obj);
        let event = copy.event_update(&old);
        self.db_txn.insert(table, copy)?;
        self.changelist.push(event);
        obj.set_version(self.version);
        Ok(())
    }

    fn delete(&mut self, table: &str, id: &str) -> Result<()> {
        let old = self.stored(table, id)?.ok_or(StoreError::NotFound)?;
        self.db_txn.delete(table, id)?;
        self.changelist.push(old.event_delete());
        Ok(())
    }

    fn changes(&self) -> &[O::Event] {
        &self.changelist
    }

    fn version(&self) -> Version {
        self.version
    }

    fn as_read(&self) -> &dyn ReadTxn<O> {
        self
    }
}
