use serde::{Deserialize, Serialize};

/// What a subscriber's feed does when its consumer falls behind.
///
/// Publishing never waits on a subscriber, so a bounded feed has to give
/// something up once it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Queue without limit (default).
    #[default]
    Unbounded,

    /// Queue up to `capacity` events, then close the subscription.
    ///
    /// The consumer drains what was queued and then observes end-of-stream,
    /// which tells it that it missed events and must resynchronize.
    CloseOnFull { capacity: usize },

    /// Queue up to `capacity` events and silently drop newer ones.
    DropOnFull { capacity: usize },
}

impl OverflowPolicy {
    pub fn capacity(&self) -> Option<usize> {
        match self {
            OverflowPolicy::Unbounded => None,
            OverflowPolicy::CloseOnFull { capacity } | OverflowPolicy::DropOnFull { capacity } => {
                Some((*capacity).max(1))
            }
        }
    }
}

/// Configuration for the watch queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl BusConfig {
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }
}
