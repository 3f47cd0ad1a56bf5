//! Composable query specifications
//!
//! A [`By`] describes how to look objects up without naming a table. Read
//! transactions resolve it against one table into a list of index scans and
//! de-duplicate the combined results by identity.
//!
//! ```
//! use tessera::By;
//!
//! // Everything whose id starts with "web-", plus the node named "db-1"
//! let query = By::or([By::id_prefix("web-"), By::index("name", "db-1")]);
//! assert!(matches!(query, By::Or(_)));
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use tessera_core::{IndexQuery, Object, ResultIter, StorageResult, ID_INDEX};

/// Lookup strategy for `ReadTxn::find`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// Full scan of the identity index
    All,

    /// Point lookup on the identity index
    Id(String),

    /// Identity index entries starting with a prefix
    IdPrefix(String),

    /// Entries of a secondary index with an exact key
    Index { index: String, key: String },

    /// Entries of a secondary index whose key starts with a prefix
    IndexPrefix { index: String, prefix: String },

    /// Union of every branch
    Or(Vec<By>),

    /// Objects matched by every branch, in the order of the first branch
    And(Vec<By>),
}

impl By {
    pub fn all() -> Self {
        By::All
    }

    pub fn id(id: impl Into<String>) -> Self {
        By::Id(id.into())
    }

    pub fn id_prefix(prefix: impl Into<String>) -> Self {
        By::IdPrefix(prefix.into())
    }

    pub fn index(index: impl Into<String>, key: impl Into<String>) -> Self {
        By::Index {
            index: index.into(),
            key: key.into(),
        }
    }

    pub fn index_prefix(index: impl Into<String>, prefix: impl Into<String>) -> Self {
        By::IndexPrefix {
            index: index.into(),
            prefix: prefix.into(),
        }
    }

    pub fn or(branches: impl IntoIterator<Item = By>) -> Self {
        By::Or(branches.into_iter().collect())
    }

    pub fn and(branches: impl IntoIterator<Item = By>) -> Self {
        By::And(branches.into_iter().collect())
    }

    /// Turn the query into index scans.
    ///
    /// `get` scans one index of the table the query runs against. Branches
    /// are not de-duplicated here: the same object may come out of several
    /// returned iterators.
    pub fn resolve<'a, O: Object>(
        &self,
        get: &mut dyn FnMut(&str, IndexQuery<'_>) -> StorageResult<ResultIter<'a, O>>,
    ) -> StorageResult<Vec<ResultIter<'a, O>>> {
        match self {
            By::All => Ok(vec![get(ID_INDEX, IndexQuery::All)?]),
            By::Id(id) => Ok(vec![get(ID_INDEX, IndexQuery::Exact(id))?]),
            By::IdPrefix(prefix) => Ok(vec![get(ID_INDEX, IndexQuery::Prefix(prefix))?]),
            By::Index { index, key } => Ok(vec![get(index, IndexQuery::Exact(key))?]),
            By::IndexPrefix { index, prefix } => Ok(vec![get(index, IndexQuery::Prefix(prefix))?]),
            By::Or(branches) => {
                let mut iters = Vec::with_capacity(branches.len());
                for branch in branches {
                    iters.extend(branch.resolve(get)?);
                }
                Ok(iters)
            }
            By::And(branches) => {
                let Some((first, rest)) = branches.split_first() else {
                    return Ok(Vec::new());
                };
                let mut required = Vec::with_capacity(rest.len());
                for branch in rest {
                    let ids: HashSet<String> = branch
                        .resolve(get)?
                        .into_iter()
                        .flatten()
                        .map(|obj| obj.id().to_owned())
                        .collect();
                    required.push(ids);
                }
                let matched: Vec<Arc<O>> = first
                    .resolve(get)?
                    .into_iter()
                    .flatten()
                    .filter(|obj| required.iter().all(|ids| ids.contains(obj.id())))
                    .collect();
                let iter: ResultIter<'a, O> = Box::new(matched.into_iter());
                Ok(vec![iter])
            }
        }
    }
}

impl From<&str> for By {
    fn from(id: &str) -> Self {
        By::id(id)
    }
}
