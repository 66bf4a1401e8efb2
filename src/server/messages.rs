//! WebSocket wire messages.
//!
//! One tagged enum per direction, shared by every connection. The opaque
//! action/state payloads are raw JSON values; the core never interprets
//! them.

use actix::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::identity::Criteria;
use crate::core::match_state::{MatchId, MatchOutcome};
use crate::core::queue::QueueStanding;

/// Message: client -> server.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", content = "data")]
pub enum ClientWsMessage {
    JoinQueue { criteria: Criteria },
    CancelQueue,
    SubmitAction { match_id: MatchId, action: Value },
    Ping,
}

/// Message: server -> client.
#[derive(Message, Debug, Clone, Serialize)]
#[rtype(result = "()")]
#[serde(tag = "action", content = "data")]
pub enum ServerWsMessage {
    QueueStatus(QueueStanding),
    MatchFound {
        match_id: MatchId,
    },
    StateUpdate {
        match_id: MatchId,
        version: u64,
        state: Value,
    },
    MatchEnded {
        match_id: MatchId,
        outcome: MatchOutcome,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerWsMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
