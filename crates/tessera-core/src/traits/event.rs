use crate::types::Version;
use std::fmt;

/// A notification describing one state change or a transaction boundary.
///
/// Subscribers filter the broadcast stream by handing the watch queue one or
/// more specifier events; a published event is delivered when any specifier
/// `matches` it.
pub trait Event: Clone + fmt::Debug + Send + Sync + 'static {
    /// Whether `other` belongs to the class of events this value specifies.
    fn matches(&self, other: &Self) -> bool;

    /// Approximate encoded size, used to bound batched transactions.
    ///
    /// Batches rotate on the sum of these estimates, so the value must grow
    /// with the event's payload. The default measures the `Debug` rendering
    /// without allocating it, which counts heap-held fields; override it
    /// when a cheaper or more exact figure is at hand.
    fn size_hint(&self) -> usize {
        let mut counter = ByteCounter(0);
        // Writing to a counter cannot fail unless a `Debug` impl does
        let _ = fmt::write(&mut counter, format_args!("{:?}", self));
        counter.0
    }
}

struct ByteCounter(usize);

impl fmt::Write for ByteCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// A versioned, identity-bearing row stored in one table.
///
/// `Clone` must produce an independent deep copy: the store keeps its own copy
/// of every written object and hands callers copies from `get`.
pub trait Object: Clone + fmt::Debug + Send + Sync + 'static {
    type Event: Event;

    fn id(&self) -> &str;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn event_create(&self) -> Self::Event;

    /// `self` is the new value, `previous` the value it replaces.
    fn event_update(&self, previous: &Self) -> Self::Event;

    fn event_delete(&self) -> Self::Event;
}
