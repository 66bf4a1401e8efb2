//! Pending matchmaking queue.
//!
//! Pure FIFO pairing logic. The queue is owned by the matchmaking server
//! actor, which is the single writer; everything here takes `now` as an
//! argument so sweeps are deterministic under test.
//!
//! Pairing rule: entries are scanned in ascending enqueue order and each
//! unpaired entry is matched with the earliest-enqueued compatible partner.
//! Compatibility is symmetric: same region, and the rating gap must sit
//! inside both entries' tolerances. Tolerance widens with wait time so two
//! mutually incompatible players cannot starve each other forever.

use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

use crate::config::matchmaking::MatchmakingPolicy;
use crate::core::error::CoreError;
use crate::core::identity::{Criteria, PlayerId, PlayerProfile};

/// Ticket handed back by `enqueue`; cancelling requires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueueTicket(pub Uuid);

/// One waiting player.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub ticket: QueueTicket,
    pub identity: PlayerId,
    pub profile: PlayerProfile,
    pub criteria: Criteria,
    pub enqueued_at: Instant,
}

/// A player's current standing in the queue, pushed as `QueueStatus`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStanding {
    /// 1-based position in enqueue order.
    pub position: usize,
    pub waited_secs: u64,
    /// Rating tolerance currently granted to this entry.
    pub tolerance: u32,
}

/// FIFO set of pending queue entries.
pub struct PendingQueue {
    entries: Vec<QueueEntry>,
    policy: MatchmakingPolicy,
}

impl PendingQueue {
    pub fn new(policy: MatchmakingPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &PlayerId) -> bool {
        self.entries.iter().any(|e| &e.identity == identity)
    }

    /// Add a waiting player. Fails if the identity already holds a ticket.
    pub fn enqueue(
        &mut self,
        identity: PlayerId,
        profile: PlayerProfile,
        criteria: Criteria,
        now: Instant,
    ) -> Result<QueueTicket, CoreError> {
        if self.contains(&identity) {
            return Err(CoreError::AlreadyQueued(identity));
        }
        let ticket = QueueTicket(Uuid::new_v4());
        self.entries.push(QueueEntry {
            ticket,
            identity,
            profile,
            criteria,
            enqueued_at: now,
        });
        Ok(ticket)
    }

    /// Remove the entry holding `ticket`. No-op (returns `None`) if the
    /// ticket was already paired or cancelled.
    pub fn cancel(&mut self, ticket: QueueTicket) -> Option<QueueEntry> {
        let idx = self.entries.iter().position(|e| e.ticket == ticket)?;
        Some(self.entries.remove(idx))
    }

    /// Remove a player's entry regardless of ticket, for disconnects.
    pub fn remove_identity(&mut self, identity: &PlayerId) -> Option<QueueEntry> {
        let idx = self.entries.iter().position(|e| &e.identity == identity)?;
        Some(self.entries.remove(idx))
    }

    /// Symmetric compatibility predicate at time `now`.
    fn compatible(&self, a: &QueueEntry, b: &QueueEntry, now: Instant) -> bool {
        if a.criteria.region != b.criteria.region {
            return false;
        }
        let gap = a.criteria.rating.abs_diff(b.criteria.rating);
        let tol_a = self.policy.tolerance_after(now.duration_since(a.enqueued_at));
        let tol_b = self.policy.tolerance_after(now.duration_since(b.enqueued_at));
        gap <= tol_a && gap <= tol_b
    }

    /// Run one pairing pass and remove every formed pair from the queue.
    ///
    /// Entries are visited oldest first; each picks the earliest-enqueued
    /// compatible partner still waiting. Within each pair the first element
    /// is the earlier entry.
    pub fn sweep(&mut self, now: Instant) -> Vec<(QueueEntry, QueueEntry)> {
        let mut paired = vec![false; self.entries.len()];
        let mut pairs = Vec::new();

        for i in 0..self.entries.len() {
            if paired[i] {
                continue;
            }
            for j in (i + 1)..self.entries.len() {
                if paired[j] {
                    continue;
                }
                if self.compatible(&self.entries[i], &self.entries[j], now) {
                    paired[i] = true;
                    paired[j] = true;
                    pairs.push((i, j));
                    break;
                }
            }
        }

        if pairs.is_empty() {
            return Vec::new();
        }

        // Extract pairs before compacting so indices stay valid.
        let formed: Vec<(QueueEntry, QueueEntry)> = pairs
            .iter()
            .map(|&(i, j)| (self.entries[i].clone(), self.entries[j].clone()))
            .collect();
        let mut idx = 0;
        self.entries.retain(|_| {
            let keep = !paired[idx];
            idx += 1;
            keep
        });

        formed
    }

    /// Current standing of every waiting player, oldest first.
    pub fn standings(&self, now: Instant) -> Vec<(PlayerId, QueueStanding)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, e)| {
                let waited = now.duration_since(e.enqueued_at);
                (
                    e.identity.clone(),
                    QueueStanding {
                        position: idx + 1,
                        waited_secs: waited.as_secs(),
                        tolerance: self.policy.tolerance_after(waited),
                    },
                )
            })
            .collect()
    }
}
