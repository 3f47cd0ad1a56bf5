//! Tessera Prelude
//!
//! Import this to get all commonly used types and traits:
//!
//! ```
//! use tessera::prelude::*;
//! ```

// Store and transactions
pub use crate::{Batch, By, ReadTxn, Store, Txn};

// Watching
pub use crate::{view_and_watch, watch, CancelHandle, Feed, WatchQueue};

// Core types
pub use crate::{
    DbSchema, Event, EventCommit, IndexSchema, Object, ProposalContext, ProposalError, Proposer,
    Result, StoreConfig, StoreError, StoreEvent, TableSchema, Version,
};

// Re-export common external deps
pub use std::sync::Arc;
pub use tracing;
