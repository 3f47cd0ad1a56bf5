pub mod db;
pub mod event;
pub mod proposer;

pub use db::{DbRead, DbWrite, IndexQuery, IndexedDb, ResultIter};
pub use event::{Event, Object};
pub use proposer::{ProposalContext, Proposer};
