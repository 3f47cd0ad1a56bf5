//! Table and index declarations consumed by indexed database engines.
//!
//! Every table carries an implicit identity index named [`ID_INDEX`] keyed by
//! [`Object::id`](crate::traits::Object::id). Secondary indexes are declared
//! with an indexer closure that maps an object to zero or more string keys.

use crate::error::{StorageError, StorageResult};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Name of the mandatory identity index.
pub const ID_INDEX: &str = "id";

/// Maps an object to the keys it is indexed under.
pub type Indexer<O> = Arc<dyn Fn(&O) -> Vec<String> + Send + Sync>;

/// A secondary index declaration.
pub struct IndexSchema<O> {
    pub name: String,
    pub unique: bool,
    indexer: Indexer<O>,
}

impl<O> IndexSchema<O> {
    pub fn new<F>(name: impl Into<String>, indexer: F) -> Self
    where
        F: Fn(&O) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            unique: false,
            indexer: Arc::new(indexer),
        }
    }

    /// Index with at most one key per object.
    pub fn single<F>(name: impl Into<String>, indexer: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(name, move |obj| indexer(obj).into_iter().collect())
    }

    /// Reject a second object under an already-used key.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn keys(&self, obj: &O) -> Vec<String> {
        (self.indexer)(obj)
    }
}

impl<O> Clone for IndexSchema<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            unique: self.unique,
            indexer: self.indexer.clone(),
        }
    }
}

impl<O> fmt::Debug for IndexSchema<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSchema")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .finish()
    }
}

/// A named table with its secondary indexes.
pub struct TableSchema<O> {
    pub name: String,
    pub indexes: Vec<IndexSchema<O>>,
}

impl<O> TableSchema<O> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: IndexSchema<O>) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn index(&self, name: &str) -> Option<&IndexSchema<O>> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// True for the identity index and every declared secondary index.
    pub fn has_index(&self, name: &str) -> bool {
        name == ID_INDEX || self.index(name).is_some()
    }

    fn validate(&self) -> StorageResult<()> {
        if self.name.is_empty() {
            return Err(StorageError::InvalidSchema("table name is empty".into()));
        }
        let mut seen = HashSet::new();
        for index in &self.indexes {
            if index.name == ID_INDEX {
                return Err(StorageError::InvalidSchema(format!(
                    "table {} redeclares the {} index",
                    self.name, ID_INDEX
                )));
            }
            if !seen.insert(index.name.as_str()) {
                return Err(StorageError::InvalidSchema(format!(
                    "table {} declares index {} twice",
                    self.name, index.name
                )));
            }
        }
        Ok(())
    }
}

impl<O> Clone for TableSchema<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<O> fmt::Debug for TableSchema<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("indexes", &self.indexes)
            .finish()
    }
}

/// A validated set of tables.
pub struct DbSchema<O> {
    tables: BTreeMap<String, TableSchema<O>>,
}

impl<O> DbSchema<O> {
    pub fn new(tables: impl IntoIterator<Item = TableSchema<O>>) -> StorageResult<Self> {
        let mut map = BTreeMap::new();
        for table in tables {
            table.validate()?;
            if map.contains_key(&table.name) {
                return Err(StorageError::InvalidSchema(format!(
                    "table {} declared twice",
                    table.name
                )));
            }
            map.insert(table.name.clone(), table);
        }
        Ok(Self { tables: map })
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema<O>> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema<O>> {
        self.tables.values()
    }
}

impl<O> Clone for DbSchema<O> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
        }
    }
}

impl<O> fmt::Debug for DbSchema<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.tables.iter()).finish()
    }
}
