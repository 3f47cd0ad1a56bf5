//! Writers serialize, readers never wait, and lock holders are observable

mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use tessera::prelude::*;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Counts warnings emitted on the thread it is installed on
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Concurrent read-modify-write through `update` never loses an increment
#[test]
fn test_no_lost_updates_with_retry() {
    let store = Arc::new(open_store());
    store
        .update(|tx| tx.create(NODES, &mut Node::new("counter", "0", "counter")))
        .unwrap();

    let num_threads = 8;
    let increments = 25;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..increments {
                    // Read outside the lock, retry on conflict
                    loop {
                        let mut counter = store.view(|tx| tx.get(NODES, "counter")).unwrap();
                        let value: u64 = counter.name.parse().unwrap();
                        counter.name = (value + 1).to_string();
                        match store.update(|tx| tx.update(NODES, &mut counter)) {
                            Ok(()) => break,
                            Err(err) if err.is_sequence_conflict() => continue,
                            Err(err) => panic!("unexpected error: {err}"),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let counter = store.view(|tx| tx.get(NODES, "counter")).unwrap();
    assert_eq!(counter.name, (num_threads * increments).to_string());
}

/// Each transaction's events arrive contiguously, followed by its marker
#[test]
fn test_transactions_never_interleave_on_the_queue() {
    let store = Arc::new(open_store());
    let (mut feed, _cancel) = watch(store.watch_queue(), []).unwrap();

    let num_threads = 6;
    let per_txn = 5;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..10 {
                    store
                        .update(|tx| {
                            for i in 0..per_txn {
                                let id = format!("t{t}-r{round}-{i}");
                                tx.create(NODES, &mut Node::new(&id, &id, &format!("t{t}")))?;
                            }
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let events = feed.drain();
    assert_eq!(events.len(), num_threads * 10 * (per_txn + 1));

    let mut last_version = Version::ZERO;
    for chunk in events.chunks(per_txn + 1) {
        let (marker, changes) = chunk.split_last().unwrap();
        let commit = marker.as_commit().expect("marker closes every transaction");
        assert!(commit.version > last_version);
        last_version = commit.version;

        let roles: Vec<_> = changes
            .iter()
            .map(|e| e.as_change().unwrap().node().role.clone())
            .collect();
        assert!(roles.iter().all(|r| *r == roles[0]));
        assert_eq!(commit.changelist.len(), per_txn);
    }
}

/// A snapshot taken before a commit never observes it
#[test]
fn test_view_is_isolated_from_concurrent_commit() {
    let store = Arc::new(open_store());
    seed(&store, 1);
    let in_view = Arc::new(Barrier::new(2));
    let committed = Arc::new(Barrier::new(2));

    let reader = {
        let store = Arc::clone(&store);
        let in_view = Arc::clone(&in_view);
        let committed = Arc::clone(&committed);
        thread::spawn(move || {
            store.view(|tx| {
                let before = tx.get(NODES, "node-0").unwrap();
                in_view.wait();
                committed.wait();
                let after = tx.get(NODES, "node-0").unwrap();
                (before.role, after.role, tx.get(NODES, "late").is_some())
            })
        })
    };

    in_view.wait();
    store
        .update(|tx| {
            let mut node = tx.get(NODES, "node-0").unwrap();
            node.role = "manager".into();
            tx.update(NODES, &mut node)?;
            tx.create(NODES, &mut Node::new("late", "late", "worker"))
        })
        .unwrap();
    committed.wait();

    let (before, after, saw_late) = reader.join().unwrap();
    assert_eq!(before, "worker");
    assert_eq!(after, "worker");
    assert!(!saw_late);
    assert_eq!(store.view(|tx| tx.get(NODES, "node-0")).unwrap().role, "manager");
}

/// Readers proceed while a writer holds the lock
#[test]
fn test_view_does_not_wait_for_writer() {
    let store = Arc::new(open_store());
    seed(&store, 1);
    let locked = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let writer = {
        let store = Arc::clone(&store);
        let locked = Arc::clone(&locked);
        let release = Arc::clone(&release);
        thread::spawn(move || {
            store
                .update(|_tx| {
                    locked.wait();
                    release.wait();
                    Ok(())
                })
                .unwrap();
        })
    };

    locked.wait();
    assert!(store.view(|tx| tx.get(NODES, "node-0")).is_some());
    release.wait();
    writer.join().unwrap();
}

#[test]
fn test_wedged_after_timeout() {
    let config = StoreConfig::default().with_wedge_timeout(Duration::from_millis(200));
    let store = Arc::new(open_store_with(config));
    let locked = Arc::new(Barrier::new(2));
    let checked = Arc::new(Barrier::new(2));

    assert!(!store.wedged());
    assert!(store.locked_at().is_none());

    let writer = {
        let store = Arc::clone(&store);
        let locked = Arc::clone(&locked);
        let checked = Arc::clone(&checked);
        thread::spawn(move || {
            store
                .batch(|batch| {
                    batch.update(|tx| tx.create(NODES, &mut Node::new("a", "a", "worker")))?;
                    locked.wait();
                    checked.wait();
                    Ok(())
                })
                .unwrap();
        })
    };

    locked.wait();
    let locked_at = store.locked_at().expect("batch holds the writer lock");
    assert!(locked_at <= chrono::Utc::now());
    assert!(!store.wedged());

    thread::sleep(Duration::from_millis(300));
    assert!(store.wedged());

    checked.wait();
    writer.join().unwrap();
    assert!(!store.wedged());
    assert!(store.locked_at().is_none());
}

#[test]
fn test_wedge_is_logged_once_while_polled() {
    let config = StoreConfig::default().with_wedge_timeout(Duration::from_millis(50));
    let store = Arc::new(open_store_with(config));
    let locked = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let writer = {
        let store = Arc::clone(&store);
        let locked = Arc::clone(&locked);
        let release = Arc::clone(&release);
        thread::spawn(move || {
            store
                .update(|_tx| {
                    locked.wait();
                    release.wait();
                    Ok(())
                })
                .unwrap();
        })
    };

    locked.wait();
    thread::sleep(Duration::from_millis(150));

    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..10 {
            assert!(store.wedged());
        }
    });
    assert_eq!(warnings.load(Ordering::SeqCst), 1);

    release.wait();
    writer.join().unwrap();
    assert!(!store.wedged());
}

#[test]
fn test_writers_block_on_each_other() {
    let store = Arc::new(open_store());
    let locked = Arc::new(Barrier::new(2));

    let first = {
        let store = Arc::clone(&store);
        let locked = Arc::clone(&locked);
        thread::spawn(move || {
            store
                .update(|tx| {
                    locked.wait();
                    thread::sleep(Duration::from_millis(30));
                    tx.create(NODES, &mut Node::new("first", "first", "worker"))
                })
                .unwrap();
        })
    };

    locked.wait();
    // Runs only after the first writer committed, so it sees its row
    let saw_first = store.update(|tx| Ok(tx.get(NODES, "first").is_some())).unwrap();
    first.join().unwrap();
    assert!(saw_first);
}
