use crate::error::ProposalError;
use crate::traits::Event;
use crate::types::Version;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation signal handed to a proposer for one proposal.
///
/// The store cancels it when it is closed. Proposers blocked on a consensus
/// round trip should poll it and give up with [`ProposalError::Cancelled`].
/// The store itself never imposes a timeout.
#[derive(Debug, Clone, Default)]
pub struct ProposalContext {
    cancelled: Arc<AtomicBool>,
}

impl ProposalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Consensus/replication hook that orders changelists before they commit.
///
/// # Contract
///
/// `propose_value` durably orders `changes` and, if and only if the proposal
/// is accepted, calls `on_accepted` exactly once before returning. The
/// callback performs the local commit. On rejection it returns an error and
/// never calls the callback.
///
/// The store calls `propose_value` while holding its writer lock, so only one
/// proposal is ever in flight per store and the proposer's order matches the
/// local commit order. Proposal latency extends writer-lock hold time.
pub trait Proposer<E: Event>: Send + Sync {
    /// Current log position, stamped onto objects written by a transaction
    /// that starts now.
    fn version(&self) -> Version;

    fn propose_value(
        &self,
        ctx: &ProposalContext,
        changes: &[E],
        on_accepted: &mut dyn FnMut(),
    ) -> Result<(), ProposalError>;
}
