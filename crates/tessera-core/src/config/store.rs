use crate::config::BusConfig;
use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long the writer lock may be held before the store reports itself
    /// wedged (default: 30s)
    ///
    /// Diagnostic only; a wedged store is never forcibly unlocked.
    #[serde(default = "default_wedge_timeout")]
    pub wedge_timeout_ms: u64,

    /// Changes a batch accumulates before it commits and starts a new
    /// physical transaction (default: 200)
    #[serde(default = "default_max_changes")]
    pub max_changes_per_transaction: usize,

    /// Byte budget of one physical transaction (default: 1.5 MiB)
    ///
    /// Batches commit early once their estimated size reaches three quarters
    /// of this budget.
    #[serde(default = "default_max_transaction_bytes")]
    pub max_transaction_bytes: usize,

    /// Watch queue configuration
    #[serde(default)]
    pub bus: BusConfig,
}

fn default_wedge_timeout() -> u64 {
    30_000
}

fn default_max_changes() -> usize {
    200
}

fn default_max_transaction_bytes() -> usize {
    3 * 1024 * 1024 / 2
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            wedge_timeout_ms: default_wedge_timeout(),
            max_changes_per_transaction: default_max_changes(),
            max_transaction_bytes: default_max_transaction_bytes(),
            bus: BusConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            tracing::warn!(error = %e, "rejected store config");
            StoreError::InvalidState(format!("invalid store config: {}", e))
        })
    }

    pub fn with_wedge_timeout(mut self, timeout: Duration) -> Self {
        self.wedge_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_changes_per_transaction(mut self, max: usize) -> Self {
        self.max_changes_per_transaction = max;
        self
    }

    pub fn with_max_transaction_bytes(mut self, max: usize) -> Self {
        self.max_transaction_bytes = max;
        self
    }

    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.bus = bus;
        self
    }

    pub fn wedge_timeout(&self) -> Duration {
        Duration::from_millis(self.wedge_timeout_ms)
    }

    /// Estimated size at which a batch commits early
    pub fn commit_threshold_bytes(&self) -> usize {
        self.max_transaction_bytes / 4 * 3
    }
}
