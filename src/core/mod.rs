//! Core domain logic, free of any actor or transport concern.
//!
//! Everything here is plain data and plain functions: the pending
//! matchmaking queue, the match state machine, the broadcast version ledger,
//! and the collaborator seams (rules, archive). The actors under
//! `crate::server` own exactly one of these values each and serialize all
//! access through their mailboxes.

pub mod archive;
pub mod error;
pub mod identity;
pub mod match_state;
pub mod queue;
pub mod rules;
pub mod versions;
