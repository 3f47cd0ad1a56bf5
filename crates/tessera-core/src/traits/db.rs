use crate::error::StorageResult;
use std::sync::Arc;

/// Iterator over the rows matched by one index scan.
pub type ResultIter<'a, O> = Box<dyn Iterator<Item = Arc<O>> + 'a>;

/// Which keys of an index a scan visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexQuery<'k> {
    /// Every entry of the index, in key order
    All,

    /// Entries whose key equals the given key
    Exact(&'k str),

    /// Entries whose key starts with the given prefix
    Prefix(&'k str),
}

/// Read access to one consistent snapshot of the database.
///
/// Rows are returned as shared handles into the snapshot; callers must treat
/// them as read-only.
pub trait DbRead<O> {
    /// First row whose `index` key equals `key`
    fn first(&self, table: &str, index: &str, key: &str) -> StorageResult<Option<Arc<O>>>;

    /// Scan an index
    ///
    /// A row indexed under several keys may be yielded more than once by an
    /// `All` or `Prefix` scan of a multi-valued index.
    fn get(&self, table: &str, index: &str, query: IndexQuery<'_>)
        -> StorageResult<ResultIter<'_, O>>;
}

/// The single write handle of the database.
///
/// Reads through this handle observe its own uncommitted writes. Dropping
/// the handle without calling [`commit`](DbWrite::commit) discards them.
pub trait DbWrite<O>: DbRead<O> {
    /// Insert a row, replacing any row with the same identity
    fn insert(&mut self, table: &str, obj: O) -> StorageResult<()>;

    /// Remove the row with the given identity
    fn delete(&mut self, table: &str, id: &str) -> StorageResult<()>;

    /// Make every write visible to snapshots opened afterwards
    fn commit(self) -> StorageResult<()>;

    /// Discard every write
    fn abort(self);
}

/// An indexed snapshot database.
///
/// Provides:
/// - Any number of independent read snapshots
/// - At most one open write handle at a time
/// - Named tables with a mandatory identity index plus secondary indexes
pub trait IndexedDb<O>: Send + Sync {
    type ReadTxn<'a>: DbRead<O>
    where
        Self: 'a;

    type WriteTxn<'a>: DbWrite<O>
    where
        Self: 'a;

    /// Open a read snapshot
    ///
    /// Never blocks on, or is affected by, an open write handle.
    fn read_txn(&self) -> Self::ReadTxn<'_>;

    /// Open the write handle
    ///
    /// Returns an error if another write handle is still open.
    fn write_txn(&self) -> StorageResult<Self::WriteTxn<'_>>;
}
