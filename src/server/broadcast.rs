//! Broadcast scheduler actor.
//!
//! One scheduler serves every active session: each tick it pulls a
//! snapshot from each tracked session and pushes `StateUpdate`s to
//! participants whose last-sent version is behind. Version comparison is
//! the whole delta strategy: unchanged sessions cost one snapshot per
//! tick and no sends. Deliveries go through the registry, which drops
//! connections that refuse the payload; the scheduler just forgets the
//! ledger row so a reconnecting player gets the current state again.

use actix::prelude::*;
use log::debug;
use std::collections::HashMap;

use crate::config::broadcast::BroadcastPolicy;
use crate::core::match_state::{MatchId, MatchStatus, Snapshot};
use crate::core::versions::BroadcastLedger;
use crate::server::connection::registry::{ConnectivityEvent, DeliverTo};
use crate::server::messages::ServerWsMessage;
use crate::server::session::actor::{GetSnapshot, MatchSession};

/// Message: start broadcasting a session's state.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Track {
    pub match_id: MatchId,
    pub session: Addr<MatchSession>,
}

/// Message: stop broadcasting a torn-down session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Untrack {
    pub match_id: MatchId,
}

pub struct BroadcastScheduler {
    policy: BroadcastPolicy,
    registry: Recipient<DeliverTo>,
    sessions: HashMap<MatchId, Addr<MatchSession>>,
    ledger: BroadcastLedger,
}

impl BroadcastScheduler {
    pub fn new(policy: BroadcastPolicy, registry: Recipient<DeliverTo>) -> Self {
        Self {
            policy,
            registry,
            sessions: HashMap::new(),
            ledger: BroadcastLedger::new(),
        }
    }

    /// Pull a snapshot from every tracked session. Each arrives back on
    /// this actor's context and is dispatched independently, so one slow
    /// session never delays the others.
    fn tick(&mut self, ctx: &mut Context<Self>) {
        for session in self.sessions.values().cloned().collect::<Vec<_>>() {
            let pull = session
                .send(GetSnapshot)
                .into_actor(self)
                .map(|res, act, ctx| {
                    // A stopped session is about to be untracked; skip it.
                    if let Ok(snapshot) = res {
                        act.dispatch(snapshot, ctx);
                    }
                });
            ctx.spawn(pull);
        }
    }

    /// Send the snapshot to every participant that is behind.
    fn dispatch(&mut self, snapshot: Snapshot, ctx: &mut Context<Self>) {
        if snapshot.status != MatchStatus::Active {
            return;
        }
        let match_id = snapshot.match_id;
        for participant in &snapshot.participants {
            if self
                .ledger
                .advance(participant, match_id, snapshot.version)
                .is_err()
            {
                // Already holds this version.
                continue;
            }
            let identity = participant.clone();
            let update = ServerWsMessage::StateUpdate {
                match_id,
                version: snapshot.version,
                state: snapshot.state.clone(),
            };
            let push = self
                .registry
                .send(DeliverTo {
                    identity: identity.clone(),
                    message: update,
                })
                .into_actor(self)
                .map(move |res, act, _ctx| {
                    if let Ok(Err(_)) = res {
                        // Connection gone: forget the row so a reconnect
                        // receives the current state on the next tick.
                        act.ledger.forget(&identity, match_id);
                    }
                });
            ctx.spawn(push);
        }
    }
}

impl Actor for BroadcastScheduler {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.policy.tick_interval, |act, ctx| {
            act.tick(ctx);
        });
    }
}

impl Handler<Track> for BroadcastScheduler {
    type Result = ();

    fn handle(&mut self, msg: Track, _ctx: &mut Self::Context) -> Self::Result {
        debug!("[Broadcast] tracking {}", msg.match_id);
        self.sessions.insert(msg.match_id, msg.session);
    }
}

impl Handler<ConnectivityEvent> for BroadcastScheduler {
    type Result = ();

    /// Any connection change invalidates the participant's rows: the next
    /// tick resends the current state over the fresh socket instead of
    /// suppressing it as already-delivered.
    fn handle(&mut self, msg: ConnectivityEvent, _ctx: &mut Self::Context) -> Self::Result {
        match msg {
            ConnectivityEvent::Up(identity) | ConnectivityEvent::Down(identity) => {
                self.ledger.forget_participant(&identity);
            }
        }
    }
}

impl Handler<Untrack> for BroadcastScheduler {
    type Result = ();

    fn handle(&mut self, msg: Untrack, _ctx: &mut Self::Context) -> Self::Result {
        debug!("[Broadcast] untracking {}", msg.match_id);
        self.sessions.remove(&msg.match_id);
        self.ledger.forget_match(msg.match_id);
    }
}
