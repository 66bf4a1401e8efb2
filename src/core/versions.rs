//! Broadcast version ledger.
//!
//! Tracks, per (participant, match), the last state version delivered. The
//! scheduler consults it every tick: unchanged versions are suppressed
//! (`StaleVersion`), and because a row only ever moves forward, a
//! participant can never be sent a version older than one it already holds.
//! Skipped intermediate versions are coalesced by design.

use std::collections::HashMap;

use crate::core::error::CoreError;
use crate::core::identity::PlayerId;
use crate::core::match_state::MatchId;

#[derive(Default)]
pub struct BroadcastLedger {
    sent: HashMap<(PlayerId, MatchId), u64>,
}

impl BroadcastLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `version` for delivery to `participant`. Errors with
    /// `StaleVersion` when the participant already holds it (or a newer
    /// one), in which case nothing should be sent.
    pub fn advance(
        &mut self,
        participant: &PlayerId,
        match_id: MatchId,
        version: u64,
    ) -> Result<(), CoreError> {
        let key = (participant.clone(), match_id);
        match self.sent.get(&key) {
            Some(&last) if last >= version => Err(CoreError::StaleVersion),
            _ => {
                self.sent.insert(key, version);
                Ok(())
            }
        }
    }

    pub fn last_sent(&self, participant: &PlayerId, match_id: MatchId) -> Option<u64> {
        self.sent.get(&(participant.clone(), match_id)).copied()
    }

    /// Drop one participant's row for a match, after a failed delivery.
    pub fn forget(&mut self, participant: &PlayerId, match_id: MatchId) {
        self.sent.remove(&(participant.clone(), match_id));
    }

    /// Drop every row of a participant whose connection changed, so the
    /// next tick resends the current state on the fresh socket.
    pub fn forget_participant(&mut self, participant: &PlayerId) {
        self.sent.retain(|(p, _), _| p != participant);
    }

    /// Drop every row of a torn-down match.
    pub fn forget_match(&mut self, match_id: MatchId) {
        self.sent.retain(|(_, m), _| *m != match_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_version_is_always_sent() {
        let mut ledger = BroadcastLedger::new();
        let id = MatchId::new();
        assert!(ledger.advance(&PlayerId::from("a"), id, 0).is_ok());
    }

    #[test]
    fn unchanged_version_is_suppressed() {
        let mut ledger = BroadcastLedger::new();
        let id = MatchId::new();
        ledger.advance(&PlayerId::from("a"), id, 3).unwrap();
        assert_eq!(
            ledger.advance(&PlayerId::from("a"), id, 3),
            Err(CoreError::StaleVersion)
        );
    }

    #[test]
    fn versions_never_go_backwards() {
        let mut ledger = BroadcastLedger::new();
        let id = MatchId::new();
        ledger.advance(&PlayerId::from("a"), id, 5).unwrap();
        assert_eq!(
            ledger.advance(&PlayerId::from("a"), id, 4),
            Err(CoreError::StaleVersion)
        );
        // Coalescing: jumping over versions is fine.
        assert!(ledger.advance(&PlayerId::from("a"), id, 9).is_ok());
    }

    #[test]
    fn forgetting_a_row_allows_resend_after_reconnect() {
        let mut ledger = BroadcastLedger::new();
        let id = MatchId::new();
        ledger.advance(&PlayerId::from("a"), id, 7).unwrap();
        ledger.forget(&PlayerId::from("a"), id);
        assert!(ledger.advance(&PlayerId::from("a"), id, 7).is_ok());
    }

    #[test]
    fn reconnect_clears_every_row_of_the_participant() {
        let mut ledger = BroadcastLedger::new();
        let m1 = MatchId::new();
        let m2 = MatchId::new();
        ledger.advance(&PlayerId::from("a"), m1, 3).unwrap();
        ledger.advance(&PlayerId::from("a"), m2, 8).unwrap();
        ledger.advance(&PlayerId::from("b"), m1, 3).unwrap();

        ledger.forget_participant(&PlayerId::from("a"));
        assert!(ledger.advance(&PlayerId::from("a"), m1, 3).is_ok());
        assert!(ledger.advance(&PlayerId::from("a"), m2, 8).is_ok());
        assert_eq!(
            ledger.advance(&PlayerId::from("b"), m1, 3),
            Err(CoreError::StaleVersion)
        );
    }

    #[test]
    fn rows_are_scoped_per_participant_and_match() {
        let mut ledger = BroadcastLedger::new();
        let m1 = MatchId::new();
        let m2 = MatchId::new();
        ledger.advance(&PlayerId::from("a"), m1, 2).unwrap();
        assert!(ledger.advance(&PlayerId::from("b"), m1, 2).is_ok());
        assert!(ledger.advance(&PlayerId::from("a"), m2, 1).is_ok());

        ledger.forget_match(m1);
        assert!(ledger.advance(&PlayerId::from("a"), m1, 0).is_ok());
        assert_eq!(ledger.last_sent(&PlayerId::from("a"), m2), Some(1));
    }
}
