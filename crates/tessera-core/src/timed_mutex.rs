//! Mutex that remembers when it was acquired
//!
//! Serializes writers of a store. The acquisition time of the current holder
//! is published through an atomic so that diagnostics (`locked_at`,
//! wedge detection) can read it without touching the lock itself.

use crate::observe;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Mutual-exclusion lock with an observable acquisition timestamp.
#[derive(Debug, Default)]
pub struct TimedMutex {
    inner: Mutex<()>,
    // Microseconds since the Unix epoch; 0 while unlocked
    locked_at: AtomicI64,
}

/// Holds a [`TimedMutex`] until dropped.
///
/// The timestamp is cleared before the underlying lock is released, so a
/// reader never sees a stale time for a new holder.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct TimedMutexGuard<'a> {
    mutex: &'a TimedMutex,
    guard: Option<MutexGuard<'a, ()>>,
}

impl TimedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) -> TimedMutexGuard<'_> {
        let start = Instant::now();
        let guard = self.inner.lock();
        observe::record_lock_wait(start.elapsed());
        self.acquired(guard)
    }

    /// Acquire the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<TimedMutexGuard<'_>> {
        self.inner.try_lock().map(|guard| self.acquired(guard))
    }

    /// Acquire the lock, giving up after `timeout`.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<TimedMutexGuard<'_>> {
        let start = Instant::now();
        let guard = self.inner.try_lock_for(timeout)?;
        observe::record_lock_wait(start.elapsed());
        Some(self.acquired(guard))
    }

    /// When the current holder acquired the lock, or `None` if it is free.
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        match self.locked_at.load(Ordering::Acquire) {
            0 => None,
            micros => Utc.timestamp_micros(micros).single(),
        }
    }

    /// How long the current holder has held the lock.
    pub fn held_for(&self) -> Option<Duration> {
        let since = self.locked_at()?;
        (Utc::now() - since).to_std().ok()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    fn acquired<'a>(&'a self, guard: MutexGuard<'a, ()>) -> TimedMutexGuard<'a> {
        // A clock at the epoch would read as unlocked
        let now = Utc::now().timestamp_micros().max(1);
        self.locked_at.store(now, Ordering::Release);
        TimedMutexGuard {
            mutex: self,
            guard: Some(guard),
        }
    }
}

impl Drop for TimedMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.locked_at.store(0, Ordering::Release);
        drop(self.guard.take());
    }
}
