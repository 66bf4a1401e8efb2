//! Match session configuration.
//!
//! Defines the grace periods that bound a session's lifecycle: how long a
//! forming match may wait for all participants, and how long an active match
//! tolerates a disconnected participant before aborting.

use std::time::Duration;

/// Time (in seconds) a `Forming` session waits for every participant to
/// connect before self-aborting.
pub const FORMING_GRACE_SECS: u64 = 15;

/// Time (in seconds) an `Active` session tolerates an absent participant
/// before aborting. Reconnecting within this window cancels the abort.
pub const DISCONNECT_GRACE_SECS: u64 = 30;

/// Lifecycle policy handed to each match session.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub forming_grace: Duration,
    pub disconnect_grace: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            forming_grace: Duration::from_secs(FORMING_GRACE_SECS),
            disconnect_grace: Duration::from_secs(DISCONNECT_GRACE_SECS),
        }
    }
}
