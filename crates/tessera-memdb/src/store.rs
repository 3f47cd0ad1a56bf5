use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::{DbSchema, IndexedDb, Object, StorageError, StorageResult, TableSchema};

use crate::table::Snapshot;
use crate::txn::{MemReadTxn, MemWriteTxn};

/// In-memory indexed snapshot database
///
/// The current state is an immutable [`Snapshot`] behind an `ArcSwap`:
/// readers load it without locking, the single writer builds the next root
/// copy-on-write and publishes it with one atomic store on commit.
pub struct MemDb<O> {
    pub(crate) schema: Arc<DbSchema<O>>,
    root: ArcSwap<Snapshot<O>>,
    pub(crate) writer_active: AtomicBool,
}

impl<O: Object> MemDb<O> {
    /// Create an empty database with the given tables
    pub fn new(schema: DbSchema<O>) -> Self {
        let root = Snapshot::empty(&schema);
        tracing::debug!(
            tables = schema.tables().count(),
            "opened in-memory database"
        );
        Self {
            schema: Arc::new(schema),
            root: ArcSwap::from_pointee(root),
            writer_active: AtomicBool::new(false),
        }
    }

    /// Validate the table declarations and create an empty database
    pub fn open(tables: impl IntoIterator<Item = TableSchema<O>>) -> StorageResult<Self> {
        Ok(Self::new(DbSchema::new(tables)?))
    }

    pub fn schema(&self) -> &DbSchema<O> {
        &self.schema
    }

    /// Whether a write handle is currently open
    pub fn writer_active(&self) -> bool {
        self.writer_active.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, snapshot: Snapshot<O>) {
        self.root.store(Arc::new(snapshot));
    }
}

impl<O: Object> IndexedDb<O> for MemDb<O> {
    type ReadTxn<'a> = MemReadTxn<O>;
    type WriteTxn<'a> = MemWriteTxn<'a, O>;

    fn read_txn(&self) -> Self::ReadTxn<'_> {
        MemReadTxn::new(self.schema.clone(), self.root.load_full())
    }

    fn write_txn(&self) -> StorageResult<Self::WriteTxn<'_>> {
        if self
            .writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StorageError::WriterActive);
        }
        // Loaded after claiming the writer slot so no commit can be missed
        let base = self.root.load_full();
        Ok(MemWriteTxn::new(self, Snapshot::clone(&base)))
    }
}
