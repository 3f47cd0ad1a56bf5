//! Tessera Core: traits and types for the tessera object store
//!
//! This crate defines the abstractions shared by the store and its engines:
//! - Object and event capabilities (`Object`, `Event`)
//! - Indexed database engines (`IndexedDb`, `DbRead`, `DbWrite`) and schemas
//! - The consensus hook (`Proposer`)
//! - Store events published on commit (`StoreEvent`, `EventCommit`)
//! - Errors, configuration and the writer `TimedMutex`

pub mod config;
pub mod error;
pub mod observe;
pub mod timed_mutex;
pub mod traits;
pub mod types;

pub use config::{BusConfig, OverflowPolicy, StoreConfig};
pub use error::{ProposalError, Result, StorageError, StorageResult, StoreError};
pub use timed_mutex::{TimedMutex, TimedMutexGuard};
pub use traits::{
    DbRead, DbWrite, Event, IndexQuery, IndexedDb, Object, ProposalContext, Proposer, ResultIter,
};
pub use types::{
    DbSchema, EventCommit, IndexSchema, Indexer, StoreEvent, TableSchema, Version, ID_INDEX,
};
