//! Gameplay-rule collaborator seam.
//!
//! The core moves an opaque `serde_json::Value` around and never interprets
//! it; every gameplay decision goes through a `RuleSet`. `GridWalkRules` is
//! the reference implementation wired up by the binary and used in tests: a
//! turn-alternating race across a small grid.

use rand::Rng;
use serde_json::{Value, json};

use crate::core::identity::PlayerId;

/// Reject reason returned by a rule set. The session state is left untouched
/// whenever one of these comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation(pub String);

impl RuleViolation {
    pub fn new(msg: impl Into<String>) -> Self {
        RuleViolation(msg.into())
    }
}

/// Pure gameplay evaluator. `apply` must either produce a full replacement
/// state or reject; it never mutates in place, which is what makes the
/// session's apply-or-reject atomic.
pub trait RuleSet: Send + Sync {
    /// Build the opening state for the given participants.
    fn initial_state(&self, participants: &[PlayerId]) -> Value;

    /// Evaluate one action taken by `actor_index`.
    fn apply(
        &self,
        state: &Value,
        participants: &[PlayerId],
        actor_index: usize,
        action: &Value,
    ) -> Result<Value, RuleViolation>;

    /// Probe for a finished match. `Some(result)` ends the session.
    fn outcome(&self, state: &Value) -> Option<Value>;
}

/// Reference rule set: two or more players race from random spawn cells to
/// the opposite corner of a small grid, one step per turn.
pub struct GridWalkRules {
    pub width: i64,
    pub height: i64,
    /// Turn cap after which the match ends in a draw.
    pub max_moves: u64,
}

impl Default for GridWalkRules {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            max_moves: 200,
        }
    }
}

impl GridWalkRules {
    fn cell(&self, v: &Value, key: &str, idx: usize) -> Option<(i64, i64)> {
        let pair = v.get(key)?.get(idx)?;
        Some((pair.get(0)?.as_i64()?, pair.get(1)?.as_i64()?))
    }
}

impl RuleSet for GridWalkRules {
    fn initial_state(&self, participants: &[PlayerId]) -> Value {
        let mut rng = rand::rng();
        let mut spawns: Vec<(i64, i64)> = Vec::with_capacity(participants.len());
        for _ in participants {
            // Distinct spawn cells, same discipline as any board spawn.
            loop {
                let cell = (
                    rng.random_range(0..self.width),
                    rng.random_range(0..self.height),
                );
                if !spawns.contains(&cell) {
                    spawns.push(cell);
                    break;
                }
            }
        }
        let goals: Vec<(i64, i64)> = spawns
            .iter()
            .map(|&(x, y)| (self.width - 1 - x, self.height - 1 - y))
            .collect();
        json!({
            "width": self.width,
            "height": self.height,
            "turn": 0,
            "moves": 0,
            "positions": spawns,
            "goals": goals,
        })
    }

    fn apply(
        &self,
        state: &Value,
        participants: &[PlayerId],
        actor_index: usize,
        action: &Value,
    ) -> Result<Value, RuleViolation> {
        let turn = state.get("turn").and_then(Value::as_u64).unwrap_or(0) as usize;
        if turn != actor_index {
            return Err(RuleViolation::new("not your turn"));
        }
        let step = action
            .get("move")
            .ok_or_else(|| RuleViolation::new("unknown action"))?;
        let dx = step.get("dx").and_then(Value::as_i64).unwrap_or(0);
        let dy = step.get("dy").and_then(Value::as_i64).unwrap_or(0);
        if dx.abs() > 1 || dy.abs() > 1 {
            return Err(RuleViolation::new("step too large"));
        }
        let (x, y) = self
            .cell(state, "positions", actor_index)
            .ok_or_else(|| RuleViolation::new("malformed state"))?;
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= self.width || ny >= self.height {
            return Err(RuleViolation::new("out of bounds"));
        }

        let mut next = state.clone();
        next["positions"][actor_index] = json!([nx, ny]);
        next["turn"] = json!((turn + 1) % participants.len());
        let moves = state.get("moves").and_then(Value::as_u64).unwrap_or(0);
        next["moves"] = json!(moves + 1);
        Ok(next)
    }

    fn outcome(&self, state: &Value) -> Option<Value> {
        let positions = state.get("positions")?.as_array()?;
        for idx in 0..positions.len() {
            let pos = self.cell(state, "positions", idx)?;
            if Some(pos) == self.cell(state, "goals", idx) {
                return Some(json!({ "winner": idx }));
            }
        }
        let moves = state.get("moves").and_then(Value::as_u64).unwrap_or(0);
        if moves >= self.max_moves {
            return Some(json!({ "draw": true }));
        }
        None
    }
}
