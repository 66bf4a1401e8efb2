//! Connection registry actor.
//!
//! Exclusive owner of the map of live connections, keyed by player
//! identity. Every other component reaches a client through `DeliverTo`;
//! nobody else holds a transport handle.
//!
//! Reconnect policy is last-writer-wins: a fresh connection for an already
//! registered identity replaces the old one, and the old session is kicked.
//! Connectivity changes are fanned out to subscribers (matchmaking, session
//! manager) as `Up`/`Down` events.

use actix::prelude::*;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::core::error::CoreError;
use crate::core::identity::PlayerId;
use crate::server::messages::ServerWsMessage;

/// Token minted by each session actor so register/unregister pairs can be
/// matched without comparing transport handles.
pub type ConnectionToken = Uuid;

struct ConnectionHandle {
    token: ConnectionToken,
    outbound: Recipient<ServerWsMessage>,
    kick: Recipient<SessionKicked>,
    registered_at: Instant,
}

/// Message: a new connection for this identity replaced yours.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SessionKicked {
    pub reason: String,
}

/// Message: register a connection. An existing connection for the same
/// identity is kicked and replaced.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Register {
    pub identity: PlayerId,
    pub token: ConnectionToken,
    pub outbound: Recipient<ServerWsMessage>,
    pub kick: Recipient<SessionKicked>,
}

/// Message: unregister a connection. Idempotent; ignored when the token no
/// longer matches the live connection (a newer session took over).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Unregister {
    pub identity: PlayerId,
    pub token: ConnectionToken,
}

/// Message: deliver a payload to one identity's live connection.
#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct DeliverTo {
    pub identity: PlayerId,
    pub message: ServerWsMessage,
}

/// Message: report which of the given identities hold a live connection.
#[derive(Message)]
#[rtype(result = "Vec<(PlayerId, bool)>")]
pub struct CheckAlive {
    pub identities: Vec<PlayerId>,
}

/// Message: subscribe to connectivity events.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe(pub Recipient<ConnectivityEvent>);

/// Event emitted to subscribers whenever an identity gains or loses its
/// connection.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub enum ConnectivityEvent {
    Up(PlayerId),
    Down(PlayerId),
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PlayerId, ConnectionHandle>,
    subscribers: Vec<Recipient<ConnectivityEvent>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, event: ConnectivityEvent) {
        for subscriber in &self.subscribers {
            subscriber.do_send(event.clone());
        }
    }

    fn drop_connection(&mut self, identity: &PlayerId) {
        if self.connections.remove(identity).is_some() {
            self.emit(ConnectivityEvent::Down(identity.clone()));
        }
    }
}

impl Actor for ConnectionRegistry {
    type Context = Context<Self>;
}

impl Handler<Subscribe> for ConnectionRegistry {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Self::Context) -> Self::Result {
        self.subscribers.push(msg.0);
    }
}

impl Handler<Register> for ConnectionRegistry {
    type Result = ();

    fn handle(&mut self, msg: Register, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(old) = self.connections.get(&msg.identity) {
            // Last-writer-wins: the newer socket supersedes the stale one.
            old.kick.do_send(SessionKicked {
                reason: format!(
                    "{}: another connection has been registered for this identity",
                    CoreError::DuplicateConnection(msg.identity.clone()).code()
                ),
            });
            info!(
                "[Registry] Replacing connection for {} (old session kicked)",
                msg.identity
            );
        }

        self.connections.insert(
            msg.identity.clone(),
            ConnectionHandle {
                token: msg.token,
                outbound: msg.outbound,
                kick: msg.kick,
                registered_at: Instant::now(),
            },
        );
        debug!("[Registry] {} registered ({} live)", msg.identity, self.connections.len());
        // Emitted on replacement too: subscribers treat Up as "the identity
        // has a fresh socket" and reset per-connection bookkeeping.
        self.emit(ConnectivityEvent::Up(msg.identity));
    }
}

impl Handler<Unregister> for ConnectionRegistry {
    type Result = ();

    fn handle(&mut self, msg: Unregister, _ctx: &mut Self::Context) -> Self::Result {
        match self.connections.get(&msg.identity) {
            Some(handle) if handle.token == msg.token => {
                self.drop_connection(&msg.identity);
                debug!("[Registry] {} unregistered", msg.identity);
            }
            // Absent, or a newer session owns the slot: idempotent no-op.
            _ => {}
        }
    }
}

impl Handler<DeliverTo> for ConnectionRegistry {
    type Result = Result<(), CoreError>;

    fn handle(&mut self, msg: DeliverTo, _ctx: &mut Self::Context) -> Self::Result {
        let handle = self
            .connections
            .get(&msg.identity)
            .ok_or_else(|| CoreError::NotConnected(msg.identity.clone()))?;

        let sent = handle.outbound.try_send(msg.message);
        let connected_for = handle.registered_at.elapsed();
        match sent {
            Ok(()) => Ok(()),
            Err(_) => {
                // Stopped actor or saturated mailbox: either way the
                // connection is stale and gets dropped, never retried.
                warn!(
                    "[Registry] Send to {} failed after {:?}; dropping connection",
                    msg.identity, connected_for
                );
                self.drop_connection(&msg.identity);
                Err(CoreError::SendFailed(msg.identity))
            }
        }
    }
}

impl Handler<CheckAlive> for ConnectionRegistry {
    type Result = MessageResult<CheckAlive>;

    fn handle(&mut self, msg: CheckAlive, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(
            msg.identities
                .into_iter()
                .map(|id| {
                    let alive = self.connections.contains_key(&id);
                    (id, alive)
                })
                .collect(),
        )
    }
}
