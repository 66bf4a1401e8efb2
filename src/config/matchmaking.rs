//! Matchmaking configuration.
//!
//! Defines the pairing sweep cadence and the rating-compatibility window,
//! including how fast the window widens while a player waits.

use std::time::Duration;

/// Interval between periodic pairing sweeps (in seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 1;

/// Rating gap accepted between two freshly enqueued players.
pub const BASE_RATING_TOLERANCE: u32 = 100;

/// Additional rating tolerance granted per second spent waiting.
pub const TOLERANCE_WIDEN_PER_SEC: u32 = 25;

/// Upper bound on the widened rating tolerance.
pub const MAX_RATING_TOLERANCE: u32 = 1000;

/// Pairing policy handed to the matchmaking server.
#[derive(Debug, Clone)]
pub struct MatchmakingPolicy {
    pub sweep_interval: Duration,
    pub base_tolerance: u32,
    pub widen_per_sec: u32,
    pub max_tolerance: u32,
}

impl Default for MatchmakingPolicy {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            base_tolerance: BASE_RATING_TOLERANCE,
            widen_per_sec: TOLERANCE_WIDEN_PER_SEC,
            max_tolerance: MAX_RATING_TOLERANCE,
        }
    }
}

impl MatchmakingPolicy {
    /// Rating tolerance granted to an entry that has waited `waited` so far.
    pub fn tolerance_after(&self, waited: Duration) -> u32 {
        let widened = self
            .widen_per_sec
            .saturating_mul(waited.as_secs() as u32)
            .saturating_add(self.base_tolerance);
        widened.min(self.max_tolerance)
    }
}
