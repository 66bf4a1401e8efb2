//! Matchmaking server actor.
//!
//! Exclusive owner of the pending queue. Pairing runs on every enqueue and
//! on a periodic sweep; formed pairs are handed to the session manager as
//! `MatchFormed` messages after the queue mutation is done, so session
//! creation never happens inside queue bookkeeping. Waiting players receive
//! `QueueStatus` pushes through the connection registry.

use actix::prelude::*;
use log::{debug, info};
use std::time::Instant;

use crate::config::matchmaking::MatchmakingPolicy;
use crate::core::identity::{Criteria, PlayerId, PlayerProfile};
use crate::core::queue::{PendingQueue, QueueTicket};
use crate::server::connection::registry::{ConnectivityEvent, DeliverTo};
use crate::server::messages::ServerWsMessage;
use crate::server::session::manager::MatchFormed;
use crate::server::ws_error::error_payload;

/// Message: player requests a match.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Enqueue {
    pub identity: PlayerId,
    pub profile: PlayerProfile,
    pub criteria: Criteria,
    pub reply: Recipient<TicketIssued>,
}

/// Message: the queue accepted the request; keep the ticket for cancelling.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct TicketIssued {
    pub ticket: QueueTicket,
}

/// Message: player cancels a pending ticket. No-op if already paired.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CancelTicket {
    pub identity: PlayerId,
    pub ticket: QueueTicket,
}

pub struct MatchmakingServer {
    queue: PendingQueue,
    policy: MatchmakingPolicy,
    registry: Recipient<DeliverTo>,
    manager: Recipient<MatchFormed>,
}

impl MatchmakingServer {
    pub fn new(
        policy: MatchmakingPolicy,
        registry: Recipient<DeliverTo>,
        manager: Recipient<MatchFormed>,
    ) -> Self {
        Self {
            queue: PendingQueue::new(policy.clone()),
            policy,
            registry,
            manager,
        }
    }

    /// Run one pairing pass, hand formed pairs to the session manager, and
    /// push fresh standings to everyone still waiting.
    fn sweep_and_notify(&mut self) {
        let now = Instant::now();
        for (first, second) in self.queue.sweep(now) {
            info!(
                "[Matchmaking] Paired {} with {} (waited {}s / {}s)",
                first.identity,
                second.identity,
                now.duration_since(first.enqueued_at).as_secs(),
                now.duration_since(second.enqueued_at).as_secs(),
            );
            self.manager.do_send(MatchFormed { first, second });
        }
        self.push_standings(now);
    }

    fn push_standings(&self, now: Instant) {
        for (identity, standing) in self.queue.standings(now) {
            self.registry.do_send(DeliverTo {
                identity,
                message: ServerWsMessage::QueueStatus(standing),
            });
        }
    }
}

impl Actor for MatchmakingServer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.policy.sweep_interval, |act, _ctx| {
            act.sweep_and_notify();
        });
    }
}

impl Handler<Enqueue> for MatchmakingServer {
    type Result = ();

    fn handle(&mut self, msg: Enqueue, _ctx: &mut Self::Context) -> Self::Result {
        let now = Instant::now();
        match self
            .queue
            .enqueue(msg.identity.clone(), msg.profile, msg.criteria, now)
        {
            Ok(ticket) => {
                debug!("[Matchmaking] {} queued ({} waiting)", msg.identity, self.queue.len());
                msg.reply.do_send(TicketIssued { ticket });
                self.sweep_and_notify();
            }
            Err(err) => {
                debug!("[Matchmaking] {} rejected: {}", msg.identity, err);
                self.registry.do_send(DeliverTo {
                    identity: msg.identity,
                    message: error_payload(&err),
                });
            }
        }
    }
}

impl Handler<CancelTicket> for MatchmakingServer {
    type Result = ();

    fn handle(&mut self, msg: CancelTicket, _ctx: &mut Self::Context) -> Self::Result {
        if self.queue.cancel(msg.ticket).is_some() {
            debug!("[Matchmaking] {} cancelled their ticket", msg.identity);
            self.push_standings(Instant::now());
        }
    }
}

impl Handler<ConnectivityEvent> for MatchmakingServer {
    type Result = ();

    /// A disconnected player's pending entry is removed; reconnecting
    /// players re-queue explicitly.
    fn handle(&mut self, msg: ConnectivityEvent, _ctx: &mut Self::Context) -> Self::Result {
        if let ConnectivityEvent::Down(identity) = msg {
            if self.queue.remove_identity(&identity).is_some() {
                debug!("[Matchmaking] {} left the queue (disconnected)", identity);
            }
        }
    }
}
