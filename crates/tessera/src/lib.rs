//! Tessera: an embedded transactional object store
//!
//! Tessera keeps versioned objects in indexed tables and provides:
//! - **Snapshot reads**: `view` never waits for writers
//! - **Optimistic writes**: `update` checks stored versions and commits
//!   atomically under a single writer lock
//! - **Batches**: unbounded logical updates over bounded physical transactions
//! - **Queries**: the composable [`By`] algebra over identity and secondary indexes
//! - **Watches**: committed changes broadcast to filtered subscribers
//! - **Consensus hook**: an optional [`Proposer`] that must accept every
//!   changelist before it is applied
//!
//! # Quick Start
//!
//! ```
//! use tessera::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Note {
//!     id: String,
//!     text: String,
//!     version: Version,
//! }
//!
//! #[derive(Debug, Clone)]
//! enum NoteEvent {
//!     Created(String),
//!     Updated(String),
//!     Deleted(String),
//! }
//!
//! impl Event for NoteEvent {
//!     fn matches(&self, other: &Self) -> bool {
//!         std::mem::discriminant(self) == std::mem::discriminant(other)
//!     }
//! }
//!
//! impl Object for Note {
//!     type Event = NoteEvent;
//!     fn id(&self) -> &str { &self.id }
//!     fn version(&self) -> Version { self.version }
//!     fn set_version(&mut self, version: Version) { self.version = version }
//!     fn event_create(&self) -> NoteEvent { NoteEvent::Created(self.id.clone()) }
//!     fn event_update(&self, _old: &Self) -> NoteEvent { NoteEvent::Updated(self.id.clone()) }
//!     fn event_delete(&self) -> NoteEvent { NoteEvent::Deleted(self.id.clone()) }
//! }
//!
//! # fn main() -> Result<()> {
//! let store: Store<Note> = Store::open([TableSchema::new("notes")], StoreConfig::default())?;
//!
//! let mut note = Note { id: "n1".into(), text: "hello".into(), version: Version::ZERO };
//! store.update(|tx| tx.create("notes", &mut note))?;
//! assert_eq!(note.version, Version::new(1));
//!
//! let text = store.view(|tx| tx.get("notes", "n1").map(|n| n.text));
//! assert_eq!(text.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod by;
pub mod prelude;
pub mod read_txn;
pub mod store;
pub mod transaction;
pub mod watch;

// Re-export core types
pub use tessera_core::{
    config::{BusConfig, OverflowPolicy, StoreConfig},
    error::{ProposalError, Result, StorageError, StoreError},
    traits::{DbRead, DbWrite, Event, IndexQuery, IndexedDb, Object, ProposalContext, Proposer},
    types::{DbSchema, EventCommit, IndexSchema, StoreEvent, TableSchema, Version, ID_INDEX},
    TimedMutex,
};

// Re-export implementations
pub use tessera_bus::{BusError, CancelHandle, Feed, WatchQueue};
pub use tessera_memdb::MemDb;

// Re-export main types from this crate
pub use batch::Batch;
pub use by::By;
pub use read_txn::{ReadTx, ReadTxn};
pub use store::Store;
pub use transaction::{Tx, Txn};
pub use watch::{view_and_watch, watch};
