//! Broadcast scheduler configuration.

use std::time::Duration;

/// Interval (in milliseconds) between broadcast ticks. Every tick snapshots
/// each tracked session and pushes changed versions to participants.
pub const TICK_INTERVAL_MS: u64 = 100;

/// Broadcast policy handed to the scheduler.
#[derive(Debug, Clone)]
pub struct BroadcastPolicy {
    pub tick_interval: Duration,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
        }
    }
}
