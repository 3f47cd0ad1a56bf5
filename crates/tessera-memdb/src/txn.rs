use std::sync::atomic::Ordering;
use std::sync::Arc;
use tessera_core::{
    DbRead, DbSchema, DbWrite, IndexQuery, Object, ResultIter, StorageError, StorageResult,
    TableSchema,
};

use crate::store::MemDb;
use crate::table::{Snapshot, Table};

fn check_index<O>(schema: &DbSchema<O>, table: &str, index: &str) -> StorageResult<()> {
    let table_schema = schema
        .table(table)
        .ok_or_else(|| StorageError::UnknownTable(table.to_owned()))?;
    if table_schema.has_index(index) {
        Ok(())
    } else {
        Err(StorageError::UnknownIndex {
            table: table.to_owned(),
            index: index.to_owned(),
        })
    }
}

fn table_schema<'s, O>(schema: &'s DbSchema<O>, table: &str) -> StorageResult<&'s TableSchema<O>> {
    schema
        .table(table)
        .ok_or_else(|| StorageError::UnknownTable(table.to_owned()))
}

fn first<O: Object>(
    schema: &DbSchema<O>,
    snapshot: &Snapshot<O>,
    table: &str,
    index: &str,
    key: &str,
) -> StorageResult<Option<Arc<O>>> {
    check_index(schema, table, index)?;
    Ok(snapshot.table(table)?.first(index, key))
}

fn scan<'a, O: Object>(
    schema: &DbSchema<O>,
    snapshot: &'a Snapshot<O>,
    table: &str,
    index: &str,
    query: IndexQuery<'_>,
) -> StorageResult<ResultIter<'a, O>> {
    check_index(schema, table, index)?;
    let table: &'a Table<O> = snapshot.table(table)?;
    Ok(table.scan(index, query))
}

/// Read snapshot of a [`MemDb`]
///
/// Holds the root it was opened on; later commits are never visible to it.
pub struct MemReadTxn<O> {
    schema: Arc<DbSchema<O>>,
    snapshot: Arc<Snapshot<O>>,
}

impl<O: Object> MemReadTxn<O> {
    pub(crate) fn new(schema: Arc<DbSchema<O>>, snapshot: Arc<Snapshot<O>>) -> Self {
        Self { schema, snapshot }
    }

    /// Number of rows in `table` at this snapshot
    pub fn len(&self, table: &str) -> StorageResult<usize> {
        Ok(self.snapshot.table(table)?.len())
    }
}

impl<O: Object> DbRead<O> for MemReadTxn<O> {
    fn first(&self, table: &str, index: &str, key: &str) -> StorageResult<Option<Arc<O>>> {
        first(&self.schema, &self.snapshot, table, index, key)
    }

    fn get(
        &self,
        table: &str,
        index: &str,
        query: IndexQuery<'_>,
    ) -> StorageResult<ResultIter<'_, O>> {
        scan(&self.schema, &self.snapshot, table, index, query)
    }
}

/// The write handle of a [`MemDb`]
///
/// Works on a private copy of the root taken when it was opened. Touched
/// tables are copied on first write; untouched ones stay shared with every
/// outstanding snapshot. Dropping the handle without committing discards
/// all of its writes and frees the database for the next writer.
pub struct MemWriteTxn<'a, O: Object> {
    db: &'a MemDb<O>,
    snapshot: Snapshot<O>,
    writes: usize,
}

impl<'a, O: Object> MemWriteTxn<'a, O> {
    pub(crate) fn new(db: &'a MemDb<O>, snapshot: Snapshot<O>) -> Self {
        Self {
            db,
            snapshot,
            writes: 0,
        }
    }

    /// Number of inserts and deletes applied through this handle
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl<O: Object> DbRead<O> for MemWriteTxn<'_, O> {
    fn first(&self, table: &str, index: &str, key: &str) -> StorageResult<Option<Arc<O>>> {
        first(&self.db.schema, &self.snapshot, table, index, key)
    }

    fn get(
        &self,
        table: &str,
        index: &str,
        query: IndexQuery<'_>,
    ) -> StorageResult<ResultIter<'_, O>> {
        scan(&self.db.schema, &self.snapshot, table, index, query)
    }
}

impl<O: Object> DbWrite<O> for MemWriteTxn<'_, O> {
    fn insert(&mut self, table: &str, obj: O) -> StorageResult<()> {
        let schema = table_schema(&self.db.schema, table)?;
        self.snapshot.table_mut(table)?.insert(schema, obj)?;
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, table: &str, id: &str) -> StorageResult<()> {
        let schema = table_schema(&self.db.schema, table)?;
        self.snapshot.table_mut(table)?.delete(schema, id)?;
        self.writes += 1;
        Ok(())
    }

    fn commit(mut self) -> StorageResult<()> {
        let snapshot = std::mem::take(&mut self.snapshot);
        self.db.publish(snapshot);
        tracing::trace!(writes = self.writes, "memdb write committed");
        Ok(())
    }

    fn abort(self) {
        tracing::trace!(writes = self.writes, "memdb write aborted");
    }
}

impl<O: Object> Drop for MemWriteTxn<'_, O> {
    fn drop(&mut self) {
        self.db.writer_active.store(false, Ordering::Release);
    }
}
