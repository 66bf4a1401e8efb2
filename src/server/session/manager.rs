//! Session manager actor.
//!
//! Top-level orchestrator: exclusive owner of the active-session map.
//! Creates a `MatchSession` for every pair the matchmaking server forms,
//! routes inbound actions to the owning session through an ordered hook
//! list, fans connectivity events out to the affected sessions, and tears
//! sessions down once they reach a terminal state.

use actix::prelude::*;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::session::SessionPolicy;
use crate::core::archive::{MatchArchive, MatchRecord};
use crate::core::error::CoreError;
use crate::core::identity::PlayerId;
use crate::core::match_state::MatchId;
use crate::core::queue::QueueEntry;
use crate::core::rules::RuleSet;
use crate::server::broadcast::{Track, Untrack};
use crate::server::connection::registry::{CheckAlive, ConnectivityEvent, DeliverTo};
use crate::server::messages::ServerWsMessage;
use crate::server::session::actor::{ApplyAction, MatchSession, ParticipantDown, ParticipantUp};
use crate::server::ws_error::error_payload;

/// Message: the matchmaking queue formed a pair.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MatchFormed {
    pub first: QueueEntry,
    pub second: QueueEntry,
}

/// Message: a client submitted an action for a match.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RouteAction {
    pub identity: PlayerId,
    pub match_id: MatchId,
    pub action: Value,
    pub reply: Recipient<ServerWsMessage>,
}

/// Message: a session reached a terminal state.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SessionEnded {
    pub record: MatchRecord,
}

/// Cross-cutting behavior around action routing, invoked in order. The
/// explicit list replaces any middleware-style dispatch: what runs around
/// an action is visible right here.
pub trait ActionHook: Send {
    /// Veto an action before it is routed.
    fn before_route(
        &self,
        identity: &PlayerId,
        match_id: MatchId,
        action: &Value,
    ) -> Result<(), CoreError>;

    /// Observe the routing decision.
    fn after_route(&self, identity: &PlayerId, match_id: MatchId, routed: bool);
}

/// Default hook: structured logging around every routed action.
pub struct LogHook;

impl ActionHook for LogHook {
    fn before_route(
        &self,
        identity: &PlayerId,
        match_id: MatchId,
        _action: &Value,
    ) -> Result<(), CoreError> {
        debug!("[Sessions] routing action from {} to {}", identity, match_id);
        Ok(())
    }

    fn after_route(&self, identity: &PlayerId, match_id: MatchId, routed: bool) {
        if !routed {
            debug!("[Sessions] action from {} for {} not routed", identity, match_id);
        }
    }
}

struct ActiveSession {
    addr: Addr<MatchSession>,
    participants: Vec<PlayerId>,
}

pub struct SessionManager {
    rules: Arc<dyn RuleSet>,
    archive: Arc<dyn MatchArchive>,
    hooks: Vec<Box<dyn ActionHook>>,
    session_policy: SessionPolicy,
    deliver: Recipient<DeliverTo>,
    alive: Recipient<CheckAlive>,
    track: Recipient<Track>,
    untrack: Recipient<Untrack>,
    sessions: HashMap<MatchId, ActiveSession>,
    by_participant: HashMap<PlayerId, Vec<MatchId>>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<dyn RuleSet>,
        archive: Arc<dyn MatchArchive>,
        hooks: Vec<Box<dyn ActionHook>>,
        session_policy: SessionPolicy,
        deliver: Recipient<DeliverTo>,
        alive: Recipient<CheckAlive>,
        track: Recipient<Track>,
        untrack: Recipient<Untrack>,
    ) -> Self {
        Self {
            rules,
            archive,
            hooks,
            session_policy,
            deliver,
            alive,
            track,
            untrack,
            sessions: HashMap::new(),
            by_participant: HashMap::new(),
        }
    }

    fn matches_of(&self, identity: &PlayerId) -> Vec<MatchId> {
        self.by_participant
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }
}

impl Actor for SessionManager {
    type Context = Context<Self>;
}

impl Handler<MatchFormed> for SessionManager {
    type Result = ();

    fn handle(&mut self, msg: MatchFormed, ctx: &mut Self::Context) -> Self::Result {
        let participants = vec![msg.first.identity.clone(), msg.second.identity.clone()];
        let match_id = MatchId::new();
        let initial_state = self.rules.initial_state(&participants);

        let session = MatchSession::new(
            match_id,
            participants.clone(),
            initial_state,
            self.rules.clone(),
            self.session_policy.clone(),
            ctx.address().recipient(),
        )
        .start();

        self.sessions.insert(
            match_id,
            ActiveSession {
                addr: session.clone(),
                participants: participants.clone(),
            },
        );
        for participant in &participants {
            self.by_participant
                .entry(participant.clone())
                .or_default()
                .push(match_id);
        }

        self.track.do_send(Track {
            match_id,
            session: session.clone(),
        });
        for participant in &participants {
            self.deliver.do_send(DeliverTo {
                identity: participant.clone(),
                message: ServerWsMessage::MatchFound { match_id },
            });
        }
        info!(
            "[Sessions] {} created for {} ({}) and {} ({})",
            match_id,
            msg.first.identity,
            msg.first.profile.username,
            msg.second.identity,
            msg.second.profile.username
        );

        // Seed connectivity from the registry; later changes arrive as
        // connectivity events.
        let seed = self
            .alive
            .send(CheckAlive {
                identities: participants,
            })
            .into_actor(self)
            .map(move |res, _act, _ctx| {
                if let Ok(list) = res {
                    for (identity, alive) in list {
                        if alive {
                            session.do_send(ParticipantUp { identity });
                        }
                    }
                }
            });
        ctx.spawn(seed);
    }
}

impl Handler<RouteAction> for SessionManager {
    type Result = ();

    fn handle(&mut self, msg: RouteAction, _ctx: &mut Self::Context) -> Self::Result {
        for hook in &self.hooks {
            if let Err(err) = hook.before_route(&msg.identity, msg.match_id, &msg.action) {
                msg.reply.do_send(error_payload(&err));
                return;
            }
        }

        let routed = match self.sessions.get(&msg.match_id) {
            Some(entry) => {
                entry.addr.do_send(ApplyAction {
                    identity: msg.identity.clone(),
                    action: msg.action,
                    reply: msg.reply.clone(),
                });
                true
            }
            None => {
                msg.reply.do_send(error_payload(&CoreError::UnknownMatch));
                false
            }
        };

        for hook in &self.hooks {
            hook.after_route(&msg.identity, msg.match_id, routed);
        }
    }
}

impl Handler<ConnectivityEvent> for SessionManager {
    type Result = ();

    fn handle(&mut self, msg: ConnectivityEvent, _ctx: &mut Self::Context) -> Self::Result {
        match msg {
            ConnectivityEvent::Up(identity) => {
                for match_id in self.matches_of(&identity) {
                    if let Some(entry) = self.sessions.get(&match_id) {
                        entry.addr.do_send(ParticipantUp {
                            identity: identity.clone(),
                        });
                    }
                }
            }
            ConnectivityEvent::Down(identity) => {
                for match_id in self.matches_of(&identity) {
                    if let Some(entry) = self.sessions.get(&match_id) {
                        entry.addr.do_send(ParticipantDown {
                            identity: identity.clone(),
                        });
                    }
                }
            }
        }
    }
}

impl Handler<SessionEnded> for SessionManager {
    type Result = ();

    fn handle(&mut self, msg: SessionEnded, _ctx: &mut Self::Context) -> Self::Result {
        let record = msg.record;
        let match_id = record.match_id;

        if let Some(entry) = self.sessions.remove(&match_id) {
            for participant in &entry.participants {
                let now_empty = match self.by_participant.get_mut(participant) {
                    Some(list) => {
                        list.retain(|m| *m != match_id);
                        list.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.by_participant.remove(participant);
                }
            }
        }
        self.untrack.do_send(Untrack { match_id });

        // Best-effort persistence: log the failure and move on.
        if let Err(err) = self.archive.record(&record) {
            warn!("[Sessions] archiving {} failed: {}", match_id, err);
        }

        for participant in &record.participants {
            self.deliver.do_send(DeliverTo {
                identity: participant.clone(),
                message: ServerWsMessage::MatchEnded {
                    match_id,
                    outcome: record.outcome.clone(),
                },
            });
        }
        info!("[Sessions] {} torn down", match_id);
    }
}
