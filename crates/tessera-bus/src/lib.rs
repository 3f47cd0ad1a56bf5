//! # Tessera Bus
//!
//! In-process broadcast queue that carries committed store events to
//! watchers.
//!
//! The bus provides:
//! - Per-subscriber feeds that never block the publisher
//! - Predicate filtering, either by closure or by specifier events
//! - Configurable overflow handling for bounded feeds
//! - Cancel handles that release a subscription on drop
//!
//! ## Example
//!
//! ```rust
//! use tessera_bus::WatchQueue;
//!
//! let queue = WatchQueue::new();
//! let (mut feed, cancel) = queue.callback_watch(|n: &u32| *n > 1).unwrap();
//!
//! for n in 0..4 {
//!     queue.publish(n);
//! }
//! assert_eq!(feed.drain(), vec![2, 3]);
//! cancel.cancel();
//! ```

pub mod error;
pub mod feed;
pub mod filter;
pub mod queue;

pub use error::{BusError, Result};
pub use feed::Feed;
pub use filter::{any_of, Matcher};
pub use queue::{CancelHandle, WatchQueue};
pub use tessera_core::{BusConfig, OverflowPolicy};
