//! Error kinds shared across the core and the WebSocket surface.
//!
//! Each variant carries a stable wire code so clients can branch on the
//! `code` field of an error payload without parsing the human-readable text.

use thiserror::Error;

use crate::core::identity::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A live connection already exists for this identity. Policy is
    /// last-writer-wins: the kind is reported on the kicked socket, never as
    /// a register failure.
    #[error("another connection is already registered for {0}")]
    DuplicateConnection(PlayerId),

    /// No live connection for the identity.
    #[error("no live connection for {0}")]
    NotConnected(PlayerId),

    /// The transport refused the payload; the connection is stale and has
    /// been dropped.
    #[error("send to {0} failed")]
    SendFailed(PlayerId),

    /// The identity already holds a pending queue ticket.
    #[error("{0} is already queued")]
    AlreadyQueued(PlayerId),

    /// The caller is not a participant of the addressed match.
    #[error("{0} is not a participant of this match")]
    NotParticipant(PlayerId),

    /// The rule set rejected the action; the session state is unchanged.
    #[error("action rejected: {0}")]
    InvalidAction(String),

    /// The session reached a terminal state and accepts no further actions.
    #[error("session is closed")]
    SessionClosed,

    /// No active session with the given match id.
    #[error("unknown match id")]
    UnknownMatch,

    /// The participant already holds this state version. Internal to the
    /// broadcast ledger; never surfaced to clients.
    #[error("participant already holds this version")]
    StaleVersion,
}

impl CoreError {
    /// Stable wire code for the error payload.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            CoreError::NotConnected(_) => "NOT_CONNECTED",
            CoreError::SendFailed(_) => "SEND_FAILED",
            CoreError::AlreadyQueued(_) => "ALREADY_QUEUED",
            CoreError::NotParticipant(_) => "NOT_PARTICIPANT",
            CoreError::InvalidAction(_) => "INVALID_ACTION",
            CoreError::SessionClosed => "SESSION_CLOSED",
            CoreError::UnknownMatch => "UNKNOWN_MATCH",
            CoreError::StaleVersion => "STALE_VERSION",
        }
    }
}
