use std::sync::Arc;
use thiserror::Error;

/// Errors raised by an indexed database engine.
///
/// These are opaque to the store: they abort the enclosing transaction and
/// are handed back to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown index {index} on table {table}")]
    UnknownIndex { table: String, index: String },

    #[error("unique index {index} on table {table} already holds key {key:?}")]
    UniqueViolation {
        table: String,
        index: String,
        key: String,
    },

    #[error("row {id} not found in table {table}")]
    RowNotFound { table: String, id: String },

    #[error("a write transaction is already open")]
    WriterActive,

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("storage failure: {0}")]
    Internal(String),
}

/// Errors reported by a [`Proposer`](crate::traits::Proposer).
#[derive(Error, Debug, Clone)]
pub enum ProposalError {
    #[error("proposal rejected: {0}")]
    Rejected(String),

    #[error("proposal cancelled")]
    Cancelled,

    /// The proposer returned success without running the commit callback.
    #[error("proposal accepted but never applied locally")]
    NotApplied,

    #[error("proposal failed: {0:#}")]
    Other(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for ProposalError {
    fn from(err: anyhow::Error) -> Self {
        ProposalError::Other(Arc::new(err))
    }
}

/// Errors surfaced by the store and its transactions.
///
/// `AlreadyExists`, `NotFound` and `SequenceConflict` are validation failures
/// and are stable to branch on; a `SequenceConflict` means "re-read and retry".
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("object already exists")]
    AlreadyExists,

    #[error("object does not exist")]
    NotFound,

    #[error("update out of sequence")]
    SequenceConflict,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error("store is closed")]
    Closed,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0:#}")]
    Other(Arc<anyhow::Error>),
}

impl StoreError {
    /// Wrap an arbitrary application error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Other(Arc::new(anyhow::Error::new(err)))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_sequence_conflict(&self) -> bool {
        matches!(self, StoreError::SequenceConflict)
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Other(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// Application errors:
//
// Transaction callbacks return `tessera_core::Result`. Errors from application
// code can be lifted with `StoreError::other(e)` or, for `anyhow` users, with
// `?` directly thanks to `From<anyhow::Error>`. The store never inspects
// `Other`; it only aborts the transaction and returns the error unchanged.
