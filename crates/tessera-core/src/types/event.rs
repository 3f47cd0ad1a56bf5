use crate::traits::Event;
use crate::types::Version;
use std::sync::Arc;

/// Published after the last change of a committed transaction.
#[derive(Debug, Clone)]
pub struct EventCommit<E> {
    /// Every change of the transaction, in the order it was made
    pub changelist: Arc<[E]>,

    /// Version stamped by the committing transaction
    pub version: Version,
}

impl<E> EventCommit<E> {
    pub fn new(changelist: Arc<[E]>, version: Version) -> Self {
        Self {
            changelist,
            version,
        }
    }
}

impl<E> Default for EventCommit<E> {
    fn default() -> Self {
        Self {
            changelist: Arc::from(Vec::new()),
            version: Version::ZERO,
        }
    }
}

/// What the store publishes on its watch queue: object changes produced by
/// the `Object` event constructors, and one commit marker per transaction.
#[derive(Debug, Clone)]
pub enum StoreEvent<E> {
    Change(E),
    Commit(EventCommit<E>),
}

impl<E> StoreEvent<E> {
    /// Specifier matching every commit marker.
    pub fn commit_marker() -> Self {
        StoreEvent::Commit(EventCommit::default())
    }

    pub fn as_change(&self) -> Option<&E> {
        match self {
            StoreEvent::Change(event) => Some(event),
            StoreEvent::Commit(_) => None,
        }
    }

    pub fn as_commit(&self) -> Option<&EventCommit<E>> {
        match self {
            StoreEvent::Commit(commit) => Some(commit),
            StoreEvent::Change(_) => None,
        }
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, StoreEvent::Commit(_))
    }
}

impl<E: Event> Event for StoreEvent<E> {
    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (StoreEvent::Change(spec), StoreEvent::Change(event)) => spec.matches(event),
            (StoreEvent::Commit(_), StoreEvent::Commit(_)) => true,
            _ => false,
        }
    }

    fn size_hint(&self) -> usize {
        match self {
            StoreEvent::Change(event) => event.size_hint(),
            StoreEvent::Commit(commit) => commit.changelist.iter().map(Event::size_hint).sum(),
        }
    }
}

impl<E> From<E> for StoreEvent<E> {
    fn from(event: E) -> Self {
        StoreEvent::Change(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Any,
        Id(u32),
    }

    impl Event for Ping {
        fn matches(&self, other: &Self) -> bool {
            match (self, other) {
                (Ping::Any, _) => true,
                (Ping::Id(a), Ping::Id(b)) => a == b,
                (Ping::Id(_), Ping::Any) => false,
            }
        }
    }

    #[test]
    fn test_commit_marker_matches_only_commits() {
        let marker = StoreEvent::<Ping>::commit_marker();
        let commit = StoreEvent::Commit(EventCommit::new(
            Arc::from(vec![Ping::Id(1)]),
            Version::new(3),
        ));
        assert!(marker.matches(&commit));
        assert!(!marker.matches(&StoreEvent::Change(Ping::Id(1))));
    }

    #[test]
    fn test_change_matching_delegates() {
        let spec = StoreEvent::Change(Ping::Id(2));
        assert!(spec.matches(&StoreEvent::Change(Ping::Id(2))));
        assert!(!spec.matches(&StoreEvent::Change(Ping::Id(3))));
        assert!(!spec.matches(&StoreEvent::commit_marker()));
    }

    #[test]
    fn test_accessors() {
        let change: StoreEvent<Ping> = Ping::Any.into();
        assert_eq!(change.as_change(), Some(&Ping::Any));
        assert!(change.as_commit().is_none());
        assert!(StoreEvent::<Ping>::commit_marker().is_commit());
    }
}
