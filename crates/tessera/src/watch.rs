//! Subscribing to committed changes

use crate::read_txn::ReadTxn;
use crate::store::Store;
use tessera_bus::{any_of, CancelHandle, Feed, WatchQueue};
use tessera_core::{Event, IndexedDb, Object, Result, StoreEvent};

/// Subscribe to a store's watch queue
///
/// With no specifiers every event is delivered. Otherwise an event is
/// delivered when any specifier matches it; use
/// [`StoreEvent::commit_marker`] to receive transaction boundaries.
pub fn watch<E: Event>(
    queue: &WatchQueue<StoreEvent<E>>,
    specifiers: impl IntoIterator<Item = StoreEvent<E>>,
) -> Result<(Feed<StoreEvent<E>>, CancelHandle)> {
    let matcher = any_of(specifiers.into_iter().collect());
    Ok(queue.subscribe(matcher)?)
}

/// Read the store and subscribe without missing a change in between
///
/// `f` runs inside a write transaction and the subscription is made before
/// that transaction releases the writer lock, so the feed starts exactly at
/// the state `f` observed. If anything fails the subscription is cancelled.
pub fn view_and_watch<O, D, R>(
    store: &Store<O, D>,
    f: impl FnOnce(&dyn ReadTxn<O>) -> Result<R>,
    specifiers: impl IntoIterator<Item = StoreEvent<O::Event>>,
) -> Result<(R, Feed<StoreEvent<O::Event>>, CancelHandle)>
where
    O: Object,
    D: IndexedDb<O>,
{
    store.update(|tx| {
        let value = f(tx.as_read())?;
        let (feed, cancel) = watch(store.watch_queue(), specifiers)?;
        Ok((value, feed, cancel))
    })
}
