//! Per-connection inbound flood guard.
//!
//! Counts messages in one-second windows; a connection that exceeds the
//! budget has its messages refused for a short cooldown. Connection-local
//! only: one hot client never affects another.

use std::time::{Duration, Instant};

pub struct FloodGuard {
    max_per_second: u32,
    cooldown: Duration,
    window_start: Instant,
    seen_this_window: u32,
    cooling_until: Option<Instant>,
}

impl FloodGuard {
    pub fn new(max_per_second: u32, cooldown: Duration) -> Self {
        Self {
            max_per_second,
            cooldown,
            window_start: Instant::now(),
            seen_this_window: 0,
            cooling_until: None,
        }
    }

    /// Record one inbound message at `now`. Returns false if the message
    /// should be refused.
    pub fn allow(&mut self, now: Instant) -> bool {
        if let Some(until) = self.cooling_until {
            if now < until {
                return false;
            }
            self.cooling_until = None;
            self.window_start = now;
            self.seen_this_window = 0;
        }

        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.seen_this_window = 0;
        }

        self.seen_this_window += 1;
        if self.seen_this_window > self.max_per_second {
            self.cooling_until = Some(now + self.cooldown);
            return false;
        }
        true
    }
}
