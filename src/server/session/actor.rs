//! Match session actor.
//!
//! One actor per active match, exclusive owner of its `MatchState`. The
//! mailbox is the single-writer discipline: applies, connectivity changes,
//! and timers all serialize here, while distinct matches run on distinct
//! actors and never contend.

use actix::prelude::*;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::session::SessionPolicy;
use crate::core::archive::MatchRecord;
use crate::core::identity::PlayerId;
use crate::core::match_state::{MatchId, MatchState, MatchStatus, Snapshot};
use crate::core::rules::RuleSet;
use crate::server::messages::ServerWsMessage;
use crate::server::session::manager::SessionEnded;
use crate::server::ws_error::error_payload;

/// Message: a participant submitted an action. Errors go back to the
/// offending client only; accepted actions surface through the next
/// broadcast tick.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ApplyAction {
    pub identity: PlayerId,
    pub action: Value,
    pub reply: Recipient<ServerWsMessage>,
}

/// Message: read-only snapshot request from the broadcast scheduler.
#[derive(Message)]
#[rtype(result = "Snapshot")]
pub struct GetSnapshot;

/// Message: the participant's connection came up.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ParticipantUp {
    pub identity: PlayerId,
}

/// Message: the participant's connection went down.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ParticipantDown {
    pub identity: PlayerId,
}

/// Message: external completion with a final result.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CompleteMatch {
    pub result: Value,
}

/// Message: external abort (admin action).
#[derive(Message)]
#[rtype(result = "()")]
pub struct AbortMatch {
    pub reason: String,
}

pub struct MatchSession {
    state: MatchState,
    rules: Arc<dyn RuleSet>,
    policy: SessionPolicy,
    manager: Recipient<SessionEnded>,
    forming_timer: Option<SpawnHandle>,
    disconnect_timers: HashMap<PlayerId, SpawnHandle>,
}

impl MatchSession {
    pub fn new(
        match_id: MatchId,
        participants: Vec<PlayerId>,
        initial_state: Value,
        rules: Arc<dyn RuleSet>,
        policy: SessionPolicy,
        manager: Recipient<SessionEnded>,
    ) -> Self {
        Self {
            state: MatchState::new(match_id, participants, initial_state),
            rules,
            policy,
            manager,
            forming_timer: None,
            disconnect_timers: HashMap::new(),
        }
    }

    fn finish_completed(&mut self, result: Value, ctx: &mut Context<Self>) {
        if self.state.complete(result).is_ok() {
            info!("[Session] {} completed", self.state.id());
            self.notify_end(ctx);
        }
    }

    fn finish_aborted(&mut self, reason: &str, ctx: &mut Context<Self>) {
        if self.state.abort(reason).is_ok() {
            info!("[Session] {} aborted: {}", self.state.id(), reason);
            self.notify_end(ctx);
        }
    }

    /// Hand the terminal record to the manager and stop. The manager owns
    /// archiving and the final `MatchEnded` broadcast.
    fn notify_end(&mut self, ctx: &mut Context<Self>) {
        let outcome = match self.state.outcome() {
            Some(outcome) => outcome.clone(),
            None => return,
        };
        let snapshot = self.state.snapshot();
        self.manager.do_send(SessionEnded {
            record: MatchRecord {
                match_id: snapshot.match_id,
                participants: snapshot.participants,
                outcome,
                final_version: snapshot.version,
                final_state: snapshot.state,
            },
        });
        ctx.stop();
    }
}

impl Actor for MatchSession {
    type Context = Context<Self>;

    /// Arm the forming grace timer: a match whose participants never all
    /// connect aborts itself.
    fn started(&mut self, ctx: &mut Self::Context) {
        let handle = ctx.run_later(self.policy.forming_grace, |act, ctx| {
            act.forming_timer = None;
            if act.state.status() == MatchStatus::Forming {
                act.finish_aborted("participants failed to connect in time", ctx);
            }
        });
        self.forming_timer = Some(handle);
        debug!(
            "[Session] {} forming with {} participants",
            self.state.id(),
            self.state.participants().len()
        );
    }
}

impl Handler<ApplyAction> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: ApplyAction, ctx: &mut Self::Context) -> Self::Result {
        match self.state.apply(&msg.identity, &msg.action, self.rules.as_ref()) {
            Ok(version) => {
                debug!(
                    "[Session] {} applied action from {} (version {})",
                    self.state.id(),
                    msg.identity,
                    version
                );
                if let Some(result) = self.rules.outcome(self.state.state()) {
                    self.finish_completed(result, ctx);
                }
            }
            Err(err) => {
                msg.reply.do_send(error_payload(&err));
            }
        }
    }
}

impl Handler<GetSnapshot> for MatchSession {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state.snapshot())
    }
}

impl Handler<ParticipantUp> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: ParticipantUp, ctx: &mut Self::Context) -> Self::Result {
        if let Some(handle) = self.disconnect_timers.remove(&msg.identity) {
            ctx.cancel_future(handle);
            debug!(
                "[Session] {} reconnected within grace for {}",
                msg.identity,
                self.state.id()
            );
        }
        let all_connected = self.state.mark_connected(&msg.identity);
        if all_connected && self.state.status() == MatchStatus::Forming {
            self.state.activate();
            if let Some(handle) = self.forming_timer.take() {
                ctx.cancel_future(handle);
            }
            info!("[Session] {} active, all participants connected", self.state.id());
        }
    }
}

impl Handler<ParticipantDown> for MatchSession {
    type Result = ();

    /// Start the disconnect grace timer. The session only aborts if the
    /// participant is still absent when it fires; a dropped connection by
    /// itself never ends a match.
    fn handle(&mut self, msg: ParticipantDown, ctx: &mut Self::Context) -> Self::Result {
        self.state.mark_disconnected(&msg.identity);
        if self.state.status() != MatchStatus::Active
            || self.disconnect_timers.contains_key(&msg.identity)
        {
            return;
        }
        debug!(
            "[Session] {} lost {} (grace {}s)",
            self.state.id(),
            msg.identity,
            self.policy.disconnect_grace.as_secs()
        );
        let identity = msg.identity.clone();
        let handle = ctx.run_later(self.policy.disconnect_grace, move |act, ctx| {
            act.disconnect_timers.remove(&identity);
            if !act.state.is_connected(&identity) && !act.state.is_terminal() {
                act.finish_aborted("participant disconnected past grace period", ctx);
            }
        });
        self.disconnect_timers.insert(msg.identity, handle);
    }
}

impl Handler<CompleteMatch> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: CompleteMatch, ctx: &mut Self::Context) -> Self::Result {
        self.finish_completed(msg.result, ctx);
    }
}

impl Handler<AbortMatch> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: AbortMatch, ctx: &mut Self::Context) -> Self::Result {
        self.finish_aborted(&msg.reason, ctx);
    }
}
