//! Snapshot reads shared by read and write transactions

use crate::by::By;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tessera_core::{DbRead, Object, Result, ID_INDEX};

/// Read access to a consistent snapshot of the store.
pub trait ReadTxn<O: Object> {
    /// Point lookup on any index of `table`.
    ///
    /// Returns the stored value itself, shared with the snapshot; it must be
    /// treated as read-only. Use [`get`](ReadTxn::get) for a private copy.
    fn lookup(&self, table: &str, index: &str, key: &str) -> Option<Arc<O>>;

    /// Identity lookup returning a copy that is safe to modify and feed back
    /// into `Txn::update`.
    fn get(&self, table: &str, id: &str) -> Option<O>;

    /// Evaluate `by` against `table`, calling `on_match` once per distinct
    /// object in index scan order.
    fn find(&self, table: &str, by: &By, on_match: &mut dyn FnMut(Arc<O>)) -> Result<()>;

    /// [`find`](ReadTxn::find) collected into a `Vec`.
    fn find_all(&self, table: &str, by: &By) -> Result<Vec<Arc<O>>> {
        let mut found = Vec::new();
        self.find(table, by, &mut |obj| found.push(obj))?;
        Ok(found)
    }
}

pub(crate) fn lookup<O: Object>(
    db: &dyn DbRead<O>,
    table: &str,
    index: &str,
    key: &str,
) -> Option<Arc<O>> {
    match db.first(table, index, key) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(table, index, key, error = %err, "lookup failed");
            None
        }
    }
}

pub(crate) fn get<O: Object>(db: &dyn DbRead<O>, table: &str, id: &str) -> Option<O> {
    lookup(db, table, ID_INDEX, id).map(|obj| O::clone(&obj))
}

pub(crate) fn find<O: Object>(
    db: &dyn DbRead<O>,
    table: &str,
    by: &By,
    on_match: &mut dyn FnMut(Arc<O>),
) -> Result<()> {
    let iters = by.resolve(&mut |index, query| db.get(table, index, query))?;
    let mut seen = HashSet::new();
    for obj in iters.into_iter().flatten() {
        if seen.insert(obj.id().to_owned()) {
            on_match(obj);
        }
    }
    Ok(())
}

/// Read-only transaction over one database snapshot
pub struct ReadTx<O, R> {
    db_txn: R,
    _object: PhantomData<fn() -> O>,
}

impl<O: Object, R: DbRead<O>> ReadTx<O, R> {
    pub(crate) fn new(db_txn: R) -> Self {
        Self {
            db_txn,
            _object: PhantomData,
        }
    }
}

impl<O: Object, R: DbRead<O>> ReadTxn<O> for ReadTx<O, R> {
    fn lookup(&self, table: &str, index: &str, key: &str) -> Option<Arc<O>> {
        lookup(&self.db_txn, table, index, key)
    }

    fn get(&self, table: &str, id: &str) -> Option<O> {
        get(&self.db_txn, table, id)
    }

    fn find(&self, table: &str, by: &By, on_match: &mut dyn FnMut(Arc<O>)) -> Result<()> {
        find(&self.db_txn, table, by, on_match)
    }
}
