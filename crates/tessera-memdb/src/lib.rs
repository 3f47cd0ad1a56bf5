//! In-memory indexed snapshot database for tessera
//!
//! Implements the `IndexedDb` capability from `tessera-core`.
//!
//! Key features:
//! - Lock-free snapshot reads (an `ArcSwap` of an immutable root)
//! - Copy-on-write write handle; untouched tables are shared, not copied
//! - Mandatory identity index plus declared secondary indexes
//! - Unique index enforcement
//! - Single-writer semantics (a second write handle is refused)

mod store;
mod table;
mod txn;

pub use store::MemDb;
pub use txn::{MemReadTxn, MemWriteTxn};
