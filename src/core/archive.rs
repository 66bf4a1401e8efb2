//! Persistence collaborator seam.
//!
//! The session manager hands every terminal snapshot to a `MatchArchive`.
//! Persistence is best-effort from the core's perspective: a failure is
//! logged and the teardown proceeds; durability guarantees belong to the
//! collaborator.

use log::info;
use serde_json::Value;

use crate::core::identity::PlayerId;
use crate::core::match_state::{MatchId, MatchOutcome};

/// Terminal record of a finished or aborted match.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub participants: Vec<PlayerId>,
    pub outcome: MatchOutcome,
    pub final_version: u64,
    pub final_state: Value,
}

pub trait MatchArchive: Send + Sync {
    fn record(&self, record: &MatchRecord) -> Result<(), String>;
}

/// Default archive: writes the record to the log and nothing else.
pub struct LogArchive;

impl MatchArchive for LogArchive {
    fn record(&self, record: &MatchRecord) -> Result<(), String> {
        info!(
            "[Archive] match_id={} participants={} outcome={:?} final_version={}",
            record.match_id,
            record.participants.len(),
            record.outcome,
            record.final_version
        );
        Ok(())
    }
}
