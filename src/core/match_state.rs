//! Authoritative state of one match.
//!
//! `MatchState` is the single-writer unit: exactly one `MatchSession` actor
//! owns each value, so every mutation below is already serialized by the
//! owner's mailbox. The struct itself stays pure; timers, connectivity
//! events, and broadcasting live in the actor layer.
//!
//! Lifecycle: `Forming` (participants assigned, waiting for all of them to
//! be connected at once) → `Active` (actions accepted) → `Completed` or
//! `Aborted`. Terminal states accept no further actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::core::error::CoreError;
use crate::core::identity::PlayerId;
use crate::core::rules::RuleSet;

/// Unique match identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    pub fn new() -> Self {
        MatchId(Uuid::new_v4())
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    Forming,
    Active,
    Completed,
    Aborted,
}

/// Terminal result of a match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail")]
pub enum MatchOutcome {
    Completed(Value),
    Aborted(String),
}

/// Read-only clone of a session's current state, produced by `snapshot`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub match_id: MatchId,
    pub version: u64,
    pub status: MatchStatus,
    pub participants: Vec<PlayerId>,
    pub state: Value,
}

pub struct MatchState {
    id: MatchId,
    participants: Vec<PlayerId>,
    connected: Vec<bool>,
    state: Value,
    version: u64,
    status: MatchStatus,
    ended: Option<MatchOutcome>,
}

impl MatchState {
    pub fn new(id: MatchId, participants: Vec<PlayerId>, initial_state: Value) -> Self {
        let connected = vec![false; participants.len()];
        Self {
            id,
            participants,
            connected,
            state: initial_state,
            version: 0,
            status: MatchStatus::Forming,
            ended: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn participants(&self) -> &[PlayerId] {
        &self.participants
    }

    /// Borrow the opaque state blob, for rule-set probes.
    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.ended.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MatchStatus::Completed | MatchStatus::Aborted)
    }

    pub fn participant_index(&self, identity: &PlayerId) -> Option<usize> {
        self.participants.iter().position(|p| p == identity)
    }

    /// Record a participant as connected. Returns true once every
    /// participant is connected simultaneously, which is the `Forming →
    /// Active` trigger.
    pub fn mark_connected(&mut self, identity: &PlayerId) -> bool {
        if let Some(idx) = self.participant_index(identity) {
            self.connected[idx] = true;
        }
        self.connected.iter().all(|c| *c)
    }

    pub fn mark_disconnected(&mut self, identity: &PlayerId) {
        if let Some(idx) = self.participant_index(identity) {
            self.connected[idx] = false;
        }
    }

    pub fn is_connected(&self, identity: &PlayerId) -> bool {
        self.participant_index(identity)
            .map(|idx| self.connected[idx])
            .unwrap_or(false)
    }

    /// `Forming → Active`. No-op unless currently forming.
    pub fn activate(&mut self) -> bool {
        if self.status == MatchStatus::Forming {
            self.status = MatchStatus::Active;
            return true;
        }
        false
    }

    /// Apply one action through the rule set. Atomic: on rejection the state
    /// and version are untouched. Returns the new version on success.
    pub fn apply(
        &mut self,
        caller: &PlayerId,
        action: &Value,
        rules: &dyn RuleSet,
    ) -> Result<u64, CoreError> {
        if self.is_terminal() {
            return Err(CoreError::SessionClosed);
        }
        let idx = self
            .participant_index(caller)
            .ok_or_else(|| CoreError::NotParticipant(caller.clone()))?;
        if self.status != MatchStatus::Active {
            return Err(CoreError::InvalidAction("match has not started".into()));
        }
        let next = rules
            .apply(&self.state, &self.participants, idx, action)
            .map_err(|violation| CoreError::InvalidAction(violation.0))?;
        self.state = next;
        self.version += 1;
        Ok(self.version)
    }

    /// `Active → Completed` with the rule set's result.
    pub fn complete(&mut self, result: Value) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::SessionClosed);
        }
        self.status = MatchStatus::Completed;
        self.ended = Some(MatchOutcome::Completed(result));
        Ok(())
    }

    /// `Forming | Active → Aborted`.
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::SessionClosed);
        }
        self.status = MatchStatus::Aborted;
        self.ended = Some(MatchOutcome::Aborted(reason.into()));
        Ok(())
    }

    /// Cheap read-only clone of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            match_id: self.id,
            version: self.version,
            status: self.status,
            participants: self.participants.clone(),
            state: self.state.clone(),
        }
    }
}
