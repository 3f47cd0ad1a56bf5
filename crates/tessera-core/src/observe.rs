//! Optional metrics instrumentation for tessera.
//!
//! When the `observe` feature is enabled, store operations emit counters,
//! histograms and gauges via the [`metrics`] crate. A downstream application
//! must install a metrics recorder to collect the data.
//!
//! Without the feature every function in this module is a no-op.

/// Record a committed transaction.
///
/// - `tessera.transaction.commits_total` – counter
/// - `tessera.transaction.changes_total` – counter of changes committed
/// - `tessera.transaction.commit_duration_seconds` – histogram
#[inline]
pub fn record_commit(duration: std::time::Duration, changes: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tessera.transaction.commits_total").increment(1);
        metrics::counter!("tessera.transaction.changes_total").increment(changes as u64);
        metrics::histogram!("tessera.transaction.commit_duration_seconds")
            .record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, changes);
    }
}

/// Record a transaction that was rolled back.
///
/// - `tessera.transaction.aborts_total` – counter with `reason` label
#[inline]
pub fn record_abort(reason: &'static str) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tessera.transaction.aborts_total", "reason" => reason).increment(1);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = reason;
    }
}

/// Record a proposal round trip.
///
/// - `tessera.proposal.total` – counter with `outcome` label
/// - `tessera.proposal.duration_seconds` – histogram
#[inline]
pub fn record_proposal(duration: std::time::Duration, success: bool) {
    #[cfg(feature = "observe")]
    {
        let outcome = if success { "ok" } else { "fail" };
        metrics::counter!("tessera.proposal.total", "outcome" => outcome).increment(1);
        metrics::histogram!("tessera.proposal.duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, success);
    }
}

/// Record an intermediate batch commit.
///
/// - `tessera.batch.rotations_total` – counter
#[inline]
pub fn record_batch_rotation() {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tessera.batch.rotations_total").increment(1);
    }
}

/// Record writer lock wait time.
///
/// - `tessera.lock.wait_duration_seconds` – histogram
#[inline]
pub fn record_lock_wait(duration: std::time::Duration) {
    #[cfg(feature = "observe")]
    {
        metrics::histogram!("tessera.lock.wait_duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = duration;
    }
}

/// Record events handed to the watch queue.
///
/// - `tessera.bus.published_total` – counter
/// - `tessera.bus.dropped_total` – counter of deliveries skipped on overflow
#[inline]
pub fn record_publish(delivered: usize, dropped: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tessera.bus.published_total").increment(delivered as u64);
        if dropped > 0 {
            metrics::counter!("tessera.bus.dropped_total").increment(dropped as u64);
        }
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (delivered, dropped);
    }
}

/// Set the current subscriber count gauge.
///
/// - `tessera.bus.subscribers` – gauge
#[inline]
pub fn set_subscriber_count(count: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::gauge!("tessera.bus.subscribers").set(count as f64);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = count;
    }
}
