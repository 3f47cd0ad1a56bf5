use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tessera_core::{
    DbSchema, IndexQuery, Object, ResultIter, StorageError, StorageResult, TableSchema, ID_INDEX,
};

/// Secondary index: key -> ids of the rows indexed under it
type IndexMap = BTreeMap<String, BTreeSet<String>>;

/// One table of a snapshot
///
/// Rows are shared between snapshots; a write handle clones the table (not
/// the rows) the first time it touches it.
pub(crate) struct Table<O> {
    rows: BTreeMap<String, Arc<O>>,
    indexes: HashMap<String, IndexMap>,
}

impl<O> Clone for Table<O> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<O: Object> Table<O> {
    fn new(schema: &TableSchema<O>) -> Self {
        Self {
            rows: BTreeMap::new(),
            indexes: schema
                .indexes
                .iter()
                .map(|index| (index.name.clone(), IndexMap::new()))
                .collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn first(&self, index: &str, key: &str) -> Option<Arc<O>> {
        if index == ID_INDEX {
            return self.rows.get(key).cloned();
        }
        let id = self.indexes.get(index)?.get(key)?.iter().next()?;
        self.rows.get(id).cloned()
    }

    pub(crate) fn scan<'a>(&'a self, index: &str, query: IndexQuery<'_>) -> ResultIter<'a, O> {
        if index == ID_INDEX {
            return match query {
                IndexQuery::All => Box::new(self.rows.values().cloned()),
                IndexQuery::Exact(key) => Box::new(self.rows.get(key).cloned().into_iter()),
                IndexQuery::Prefix(prefix) => {
                    let prefix = prefix.to_owned();
                    Box::new(
                        self.rows
                            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                            .take_while(move |(id, _)| id.starts_with(&prefix))
                            .map(|(_, row)| row.clone()),
                    )
                }
            };
        }

        let Some(map) = self.indexes.get(index) else {
            return Box::new(std::iter::empty());
        };
        let ids: Box<dyn Iterator<Item = &'a String> + 'a> = match query {
            IndexQuery::All => Box::new(map.values().flatten()),
            IndexQuery::Exact(key) => Box::new(map.get(key).into_iter().flatten()),
            IndexQuery::Prefix(prefix) => {
                let prefix = prefix.to_owned();
                Box::new(
                    map.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                        .take_while(move |(key, _)| key.starts_with(&prefix))
                        .flat_map(|(_, ids)| ids.iter()),
                )
            }
        };
        Box::new(ids.filter_map(move |id| self.rows.get(id).cloned()))
    }

    /// Insert or replace a row, keeping every secondary index in step.
    ///
    /// Unique indexes are checked before anything is modified, so a
    /// violation leaves the table untouched.
    pub(crate) fn insert(&mut self, schema: &TableSchema<O>, obj: O) -> StorageResult<()> {
        let id = obj.id().to_owned();

        for index in schema.indexes.iter().filter(|index| index.unique) {
            let Some(map) = self.indexes.get(&index.name) else {
                continue;
            };
            for key in index.keys(&obj) {
                let taken = map
                    .get(&key)
                    .is_some_and(|ids| ids.iter().any(|other| *other != id));
                if taken {
                    return Err(StorageError::UniqueViolation {
                        table: schema.name.clone(),
                        index: index.name.clone(),
                        key,
                    });
                }
            }
        }

        if let Some(old) = self.rows.get(&id).cloned() {
            self.unindex(schema, &old);
        }
        for index in &schema.indexes {
            if let Some(map) = self.indexes.get_mut(&index.name) {
                for key in index.keys(&obj) {
                    map.entry(key).or_default().insert(id.clone());
                }
            }
        }
        self.rows.insert(id, Arc::new(obj));
        Ok(())
    }

    pub(crate) fn delete(&mut self, schema: &TableSchema<O>, id: &str) -> StorageResult<()> {
        let old = self
            .rows
            .remove(id)
            .ok_or_else(|| StorageError::RowNotFound {
                table: schema.name.clone(),
                id: id.to_owned(),
            })?;
        self.unindex(schema, &old);
        Ok(())
    }

    fn unindex(&mut self, schema: &TableSchema<O>, obj: &O) {
        for index in &schema.indexes {
            let Some(map) = self.indexes.get_mut(&index.name) else {
                continue;
            };
            for key in index.keys(obj) {
                if let Some(ids) = map.get_mut(&key) {
                    ids.remove(obj.id());
                    if ids.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        }
    }
}

/// Immutable root of the database: every table at one point in time
pub(crate) struct Snapshot<O> {
    tables: HashMap<String, Arc<Table<O>>>,
}

impl<O> Clone for Snapshot<O> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
        }
    }
}

impl<O> Default for Snapshot<O> {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }
}

impl<O: Object> Snapshot<O> {
    pub(crate) fn empty(schema: &DbSchema<O>) -> Self {
        Self {
            tables: schema
                .tables()
                .map(|table| (table.name.clone(), Arc::new(Table::new(table))))
                .collect(),
        }
    }

    pub(crate) fn table(&self, name: &str) -> StorageResult<&Table<O>> {
        self.tables
            .get(name)
            .map(|table| table.as_ref())
            .ok_or_else(|| StorageError::UnknownTable(name.to_owned()))
    }

    /// Mutable access to a table, copying it out of any shared snapshot.
    pub(crate) fn table_mut(&mut self, name: &str) -> StorageResult<&mut Table<O>> {
        self.tables
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| StorageError::UnknownTable(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{Event, IndexSchema, Version};

    #[derive(Debug, Clone)]
    struct Tag;

    impl Event for Tag {
        fn matches(&self, _other: &Self) -> bool {
            true
        }
    }

    #[derive(Debug, Clone)]
    struct Row {
        id: String,
        name: String,
        tags: Vec<String>,
    }

    impl Object for Row {
        type Event = Tag;

        fn id(&self) -> &str {
            &self.id
        }

        fn version(&self) -> Version {
            Version::ZERO
        }

        fn set_version(&mut self, _version: Version) {}

        fn event_create(&self) -> Tag {
            Tag
        }

        fn event_update(&self, _previous: &Self) -> Tag {
            Tag
        }

        fn event_delete(&self) -> Tag {
            Tag
        }
    }

    fn row(id: &str, name: &str, tags: &[&str]) -> Row {
        Row {
            id: id.into(),
            name: name.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn schema() -> TableSchema<Row> {
        TableSchema::new("rows")
            .with_index(IndexSchema::single("name", |r: &Row| Some(r.name.clone())).unique())
            .with_index(IndexSchema::new("tags", |r: &Row| r.tags.clone()))
    }

    fn ids(iter: ResultIter<'_, Row>) -> Vec<String> {
        iter.map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_secondary_index_follows_updates() {
        let schema = schema();
        let mut table = Table::new(&schema);
        table.insert(&schema, row("a", "alpha", &["x"])).unwrap();
        table.insert(&schema, row("a", "alpha", &["y"])).unwrap();

        assert!(ids(table.scan("tags", IndexQuery::Exact("x"))).is_empty());
        assert_eq!(ids(table.scan("tags", IndexQuery::Exact("y"))), vec!["a"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unique_violation_leaves_table_untouched() {
        let schema = schema();
        let mut table = Table::new(&schema);
        table.insert(&schema, row("a", "alpha", &["x"])).unwrap();

        let err = table.insert(&schema, row("b", "alpha", &["z"])).unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { .. }));
        assert!(table.first(ID_INDEX, "b").is_none());
        assert!(ids(table.scan("tags", IndexQuery::Exact("z"))).is_empty());
    }

    #[test]
    fn test_prefix_scans() {
        let schema = schema();
        let mut table = Table::new(&schema);
        for (id, name) in [("node-1", "n1"), ("node-2", "n2"), ("task-1", "t1")] {
            table.insert(&schema, row(id, name, &[])).unwrap();
        }

        assert_eq!(
            ids(table.scan(ID_INDEX, IndexQuery::Prefix("node-"))),
            vec!["node-1", "node-2"]
        );
        assert_eq!(ids(table.scan("name", IndexQuery::Prefix("t"))), vec!["task-1"]);
        assert_eq!(table.first("name", "n2").unwrap().id, "node-2");
    }

    #[test]
    fn test_delete_clears_indexes() {
        let schema = schema();
        let mut table = Table::new(&schema);
        table.insert(&schema, row("a", "alpha", &["x"])).unwrap();
        table.delete(&schema, "a").unwrap();

        assert!(table.first("name", "alpha").is_none());
        assert!(matches!(
            table.delete(&schema, "a"),
            Err(StorageError::RowNotFound { .. })
        ));
        // The freed unique key can be reused
        table.insert(&schema, row("b", "alpha", &[])).unwrap();
    }

    #[test]
    fn test_copy_on_write_leaves_snapshot_intact() {
        let db_schema = DbSchema::new(vec![schema()]).unwrap();
        let table_schema = db_schema.table("rows").unwrap();
        let base = Snapshot::empty(&db_schema);

        let mut next = base.clone();
        next.table_mut("rows")
            .unwrap()
            .insert(table_schema, row("a", "alpha", &[]))
            .unwrap();

        assert_eq!(base.table("rows").unwrap().len(), 0);
        assert_eq!(next.table("rows").unwrap().len(), 1);
        assert!(matches!(
            base.table("missing"),
            Err(StorageError::UnknownTable(_))
        ));
    }
}
