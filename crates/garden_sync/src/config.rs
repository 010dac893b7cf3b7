use serde::{Deserialize, Serialize};

pub const DEFAULT_PRICE_PER_SPACE_CENTS: u64 = 100;
pub const DEFAULT_HISTORY_LIMIT: usize = 256;
pub const DEFAULT_OUTCOME_CHANNEL: usize = 64;

/// Runtime knobs for a [`crate::GardenSession`] and the purchase flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub price_per_space_cents: u64,
    /// Sync outcomes kept for inspection; older ones are dropped first.
    pub history_limit: usize,
    pub outcome_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            price_per_space_cents: DEFAULT_PRICE_PER_SPACE_CENTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            outcome_channel_capacity: DEFAULT_OUTCOME_CHANNEL,
        }
    }
}
