pub mod event;
pub mod schema;
pub mod version;

pub use event::{EventCommit, StoreEvent};
pub use schema::{DbSchema, IndexSchema, Indexer, TableSchema, ID_INDEX};
pub use version::Version;
