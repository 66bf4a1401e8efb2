//! Actor-level tests: connection registry semantics, pairing flow, session
//! lifecycle timers, and apply serialization. Pure-logic tests live next to
//! their modules under `core`.

use actix::prelude::*;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::broadcast::BroadcastPolicy;
use crate::config::matchmaking::MatchmakingPolicy;
use crate::config::session::SessionPolicy;
use crate::core::identity::{Criteria, PlayerId, PlayerProfile};
use crate::core::match_state::{MatchId, MatchOutcome, MatchStatus};
use crate::core::rules::{RuleSet, RuleViolation};
use crate::server::broadcast::{BroadcastScheduler, Track};
use crate::server::connection::registry::{
    CheckAlive, ConnectionRegistry, ConnectivityEvent, DeliverTo, Register, SessionKicked,
    Subscribe, Unregister,
};
use crate::server::matchmaking::server::{Enqueue, MatchmakingServer, TicketIssued};
use crate::server::messages::ServerWsMessage;
use crate::server::session::actor::{
    AbortMatch, ApplyAction, CompleteMatch, GetSnapshot, MatchSession, ParticipantDown,
    ParticipantUp,
};
use crate::server::session::manager::{MatchFormed, SessionEnded};

/// Stand-in for a client session: records everything the server pushes.
#[derive(Default)]
struct StubClient {
    inbox: Arc<Mutex<Vec<ServerWsMessage>>>,
    kicked: Arc<Mutex<bool>>,
    tickets: Arc<Mutex<Vec<TicketIssued>>>,
}

#[derive(Message)]
#[rtype(result = "()")]
struct Shutdown;

impl Actor for StubClient {
    type Context = Context<Self>;
}

impl Handler<ServerWsMessage> for StubClient {
    type Result = ();

    fn handle(&mut self, msg: ServerWsMessage, _ctx: &mut Self::Context) {
        self.inbox.lock().unwrap().push(msg);
    }
}

impl Handler<SessionKicked> for StubClient {
    type Result = ();

    fn handle(&mut self, _msg: SessionKicked, ctx: &mut Self::Context) {
        *self.kicked.lock().unwrap() = true;
        ctx.stop();
    }
}

impl Handler<TicketIssued> for StubClient {
    type Result = ();

    fn handle(&mut self, msg: TicketIssued, _ctx: &mut Self::Context) {
        self.tickets.lock().unwrap().push(msg);
    }
}

impl Handler<Shutdown> for StubClient {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

/// Stand-in for the session manager: records formed pairs and ended
/// sessions.
#[derive(Default)]
struct StubManager {
    formed: Arc<Mutex<Vec<(PlayerId, PlayerId)>>>,
    ended: Arc<Mutex<Vec<MatchOutcome>>>,
}

impl Actor for StubManager {
    type Context = Context<Self>;
}

impl Handler<MatchFormed> for StubManager {
    type Result = ();

    fn handle(&mut self, msg: MatchFormed, _ctx: &mut Self::Context) {
        self.formed
            .lock()
            .unwrap()
            .push((msg.first.identity, msg.second.identity));
    }
}

impl Handler<SessionEnded> for StubManager {
    type Result = ();

    fn handle(&mut self, msg: SessionEnded, _ctx: &mut Self::Context) {
        self.ended.lock().unwrap().push(msg.record.outcome);
    }
}

/// Stand-in connectivity subscriber.
#[derive(Default)]
struct StubSubscriber {
    events: Arc<Mutex<Vec<ConnectivityEvent>>>,
}

impl Actor for StubSubscriber {
    type Context = Context<Self>;
}

impl Handler<ConnectivityEvent> for StubSubscriber {
    type Result = ();

    fn handle(&mut self, msg: ConnectivityEvent, _ctx: &mut Self::Context) {
        self.events.lock().unwrap().push(msg);
    }
}

/// Accepts every action and never finishes the match.
struct EndlessRules;

impl RuleSet for EndlessRules {
    fn initial_state(&self, _participants: &[PlayerId]) -> Value {
        json!({ "count": 0 })
    }

    fn apply(
        &self,
        state: &Value,
        _participants: &[PlayerId],
        _actor_index: usize,
        _action: &Value,
    ) -> Result<Value, RuleViolation> {
        let count = state["count"].as_u64().unwrap_or(0);
        Ok(json!({ "count": count + 1 }))
    }

    fn outcome(&self, _state: &Value) -> Option<Value> {
        None
    }
}

fn profile(name: &str) -> PlayerProfile {
    PlayerProfile {
        username: name.to_string(),
        rating: 1200,
        region: "eu".to_string(),
    }
}

fn register(registry: &Addr<ConnectionRegistry>, identity: &str, client: &Addr<StubClient>) -> uuid::Uuid {
    let token = uuid::Uuid::new_v4();
    registry.do_send(Register {
        identity: PlayerId::from(identity),
        token,
        outbound: client.clone().recipient(),
        kick: client.clone().recipient(),
    });
    token
}

fn start_session(
    participants: &[&str],
    policy: SessionPolicy,
    manager: Recipient<SessionEnded>,
) -> Addr<MatchSession> {
    let ids: Vec<PlayerId> = participants.iter().map(|p| PlayerId::from(*p)).collect();
    MatchSession::new(
        MatchId::new(),
        ids,
        json!({ "count": 0 }),
        Arc::new(EndlessRules),
        policy,
        manager,
    )
    .start()
}

#[actix_rt::test]
async fn registry_newer_connection_supersedes_older() {
    let registry = ConnectionRegistry::new().start();

    let first = StubClient::default();
    let first_inbox = first.inbox.clone();
    let first_kicked = first.kicked.clone();
    let first_addr = first.start();

    let second = StubClient::default();
    let second_inbox = second.inbox.clone();
    let second_addr = second.start();

    let old_token = register(&registry, "ada", &first_addr);
    register(&registry, "ada", &second_addr);

    registry
        .send(DeliverTo {
            identity: PlayerId::from("ada"),
            message: ServerWsMessage::error("TEST", "hello"),
        })
        .await
        .unwrap()
        .unwrap();
    actix_rt::time::sleep(Duration::from_millis(50)).await;

    assert!(*first_kicked.lock().unwrap());
    assert!(first_inbox.lock().unwrap().is_empty());
    assert_eq!(second_inbox.lock().unwrap().len(), 1);

    // The superseded session's unregister must not evict the new one.
    registry.do_send(Unregister {
        identity: PlayerId::from("ada"),
        token: old_token,
    });
    let alive = registry
        .send(CheckAlive {
            identities: vec![PlayerId::from("ada")],
        })
        .await
        .unwrap();
    assert_eq!(alive, vec![(PlayerId::from("ada"), true)]);
}

#[actix_rt::test]
async fn registry_unregister_is_idempotent() {
    let registry = ConnectionRegistry::new().start();
    let subscriber = StubSubscriber::default();
    let events = subscriber.events.clone();
    registry.do_send(Subscribe(subscriber.start().recipient()));

    let client = StubClient::default();
    let client_addr = client.start();
    let token = register(&registry, "ada", &client_addr);

    registry.do_send(Unregister {
        identity: PlayerId::from("ada"),
        token,
    });
    registry.do_send(Unregister {
        identity: PlayerId::from("ada"),
        token,
    });
    actix_rt::time::sleep(Duration::from_millis(50)).await;

    let err = registry
        .send(DeliverTo {
            identity: PlayerId::from("ada"),
            message: ServerWsMessage::error("TEST", "hello"),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), "NOT_CONNECTED");

    // One Up and exactly one Down despite the double unregister.
    let seen = events.lock().unwrap();
    let downs = seen
        .iter()
        .filter(|e| matches!(e, ConnectivityEvent::Down(_)))
        .count();
    assert_eq!(downs, 1);
}

#[actix_rt::test]
async fn registry_drops_connection_whose_actor_is_gone() {
    let registry = ConnectionRegistry::new().start();
    let subscriber = StubSubscriber::default();
    let events = subscriber.events.clone();
    registry.do_send(Subscribe(subscriber.start().recipient()));

    let client = StubClient::default();
    let client_addr = client.start();
    register(&registry, "ada", &client_addr);
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    client_addr.send(Shutdown).await.unwrap();
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    let err = registry
        .send(DeliverTo {
            identity: PlayerId::from("ada"),
            message: ServerWsMessage::error("TEST", "hello"),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), "SEND_FAILED");

    // The failed send emitted Down; later sends report NotConnected.
    actix_rt::time::sleep(Duration::from_millis(20)).await;
    assert!(
        events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ConnectivityEvent::Down(_)))
    );
    let err = registry
        .send(DeliverTo {
            identity: PlayerId::from("ada"),
            message: ServerWsMessage::error("TEST", "again"),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), "NOT_CONNECTED");
}

#[actix_rt::test]
async fn matchmaking_pairs_compatible_players_once() {
    let registry = ConnectionRegistry::new().start();
    let manager = StubManager::default();
    let formed = manager.formed.clone();
    let manager_addr = manager.start();

    let matchmaking = MatchmakingServer::new(
        MatchmakingPolicy::default(),
        registry.clone().recipient(),
        manager_addr.recipient(),
    )
    .start();

    let ada = StubClient::default();
    let ada_tickets = ada.tickets.clone();
    let ada_addr = ada.start();
    let bob = StubClient::default();
    let bob_addr = bob.start();
    register(&registry, "ada", &ada_addr);
    register(&registry, "bob", &bob_addr);

    matchmaking.do_send(Enqueue {
        identity: PlayerId::from("ada"),
        profile: profile("ada"),
        criteria: Criteria::new(1200, "eu"),
        reply: ada_addr.clone().recipient(),
    });
    matchmaking.do_send(Enqueue {
        identity: PlayerId::from("bob"),
        profile: profile("bob"),
        criteria: Criteria::new(1200, "eu"),
        reply: bob_addr.clone().recipient(),
    });
    actix_rt::time::sleep(Duration::from_millis(100)).await;

    let pairs = formed.lock().unwrap().clone();
    assert_eq!(
        pairs,
        vec![(PlayerId::from("ada"), PlayerId::from("bob"))]
    );
    assert_eq!(ada_tickets.lock().unwrap().len(), 1);

    // Queue drained: ada can enqueue again without AlreadyQueued.
    matchmaking.do_send(Enqueue {
        identity: PlayerId::from("ada"),
        profile: profile("ada"),
        criteria: Criteria::new(1200, "eu"),
        reply: ada_addr.clone().recipient(),
    });
    actix_rt::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ada_tickets.lock().unwrap().len(), 2);
}

#[actix_rt::test]
async fn forming_session_aborts_when_grace_expires() {
    let manager = StubManager::default();
    let ended = manager.ended.clone();
    let manager_addr = manager.start();

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_millis(100),
            disconnect_grace: Duration::from_millis(50),
        },
        manager_addr.recipient(),
    );

    // Only one of two participants ever connects.
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    actix_rt::time::sleep(Duration::from_millis(250)).await;

    let outcomes = ended.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], MatchOutcome::Aborted(_)));
}

#[actix_rt::test]
async fn concurrent_applies_serialize_into_sequential_versions() {
    let manager = StubManager::default();
    let manager_addr = manager.start();

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_secs(5),
            disconnect_grace: Duration::from_secs(5),
        },
        manager_addr.recipient(),
    );
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    session.do_send(ParticipantUp {
        identity: PlayerId::from("bob"),
    });

    let sink = StubClient::default();
    let sink_inbox = sink.inbox.clone();
    let sink_addr = sink.start();

    // Two applies land in the mailbox together; both must be applied, in
    // order, with no lost update.
    session.do_send(ApplyAction {
        identity: PlayerId::from("ada"),
        action: json!("go"),
        reply: sink_addr.clone().recipient(),
    });
    session.do_send(ApplyAction {
        identity: PlayerId::from("bob"),
        action: json!("go"),
        reply: sink_addr.clone().recipient(),
    });

    let snapshot = session.send(GetSnapshot).await.unwrap();
    assert_eq!(snapshot.status, MatchStatus::Active);
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.state, json!({ "count": 2 }));
    // No errors went back to the clients.
    assert!(sink_inbox.lock().unwrap().is_empty());
}

#[actix_rt::test]
async fn apply_errors_reach_only_the_offending_client() {
    let manager = StubManager::default();
    let manager_addr = manager.start();

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_secs(5),
            disconnect_grace: Duration::from_secs(5),
        },
        manager_addr.recipient(),
    );
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    session.do_send(ParticipantUp {
        identity: PlayerId::from("bob"),
    });

    let sink = StubClient::default();
    let sink_inbox = sink.inbox.clone();
    let sink_addr = sink.start();

    session.do_send(ApplyAction {
        identity: PlayerId::from("mallory"),
        action: json!("go"),
        reply: sink_addr.clone().recipient(),
    });
    actix_rt::time::sleep(Duration::from_millis(50)).await;

    let inbox = sink_inbox.lock().unwrap();
    assert_eq!(inbox.len(), 1);
    match &inbox[0] {
        ServerWsMessage::Error { code, .. } => assert_eq!(code, "NOT_PARTICIPANT"),
        other => panic!("unexpected message: {:?}", other),
    }
    // The match itself is untouched.
    drop(inbox);
    let snapshot = session.send(GetSnapshot).await.unwrap();
    assert_eq!(snapshot.version, 0);
}

#[actix_rt::test]
async fn broadcast_sends_each_version_once_per_participant() {
    let registry = ConnectionRegistry::new().start();
    let manager = StubManager::default();
    let manager_addr = manager.start();

    let ada = StubClient::default();
    let ada_inbox = ada.inbox.clone();
    let ada_addr = ada.start();
    let bob = StubClient::default();
    let bob_inbox = bob.inbox.clone();
    let bob_addr = bob.start();
    register(&registry, "ada", &ada_addr);
    register(&registry, "bob", &bob_addr);

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_secs(5),
            disconnect_grace: Duration::from_secs(5),
        },
        manager_addr.recipient(),
    );
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    session.do_send(ParticipantUp {
        identity: PlayerId::from("bob"),
    });

    let scheduler = BroadcastScheduler::new(
        BroadcastPolicy {
            tick_interval: Duration::from_millis(20),
        },
        registry.clone().recipient(),
    )
    .start();
    let snapshot = session.send(GetSnapshot).await.unwrap();
    scheduler.do_send(Track {
        match_id: snapshot.match_id,
        session: session.clone(),
    });

    // Several ticks pass, but the unchanged version goes out exactly once.
    actix_rt::time::sleep(Duration::from_millis(150)).await;
    let updates = |inbox: &Arc<Mutex<Vec<ServerWsMessage>>>| -> Vec<u64> {
        inbox
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                ServerWsMessage::StateUpdate { version, .. } => Some(*version),
                _ => None,
            })
            .collect()
    };
    assert_eq!(updates(&ada_inbox), vec![0]);
    assert_eq!(updates(&bob_inbox), vec![0]);

    // An accepted apply bumps the version; the next tick delivers it once.
    let sink = StubClient::default();
    let sink_addr = sink.start();
    session.do_send(ApplyAction {
        identity: PlayerId::from("ada"),
        action: json!("go"),
        reply: sink_addr.clone().recipient(),
    });
    actix_rt::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(updates(&ada_inbox), vec![0, 1]);
    assert_eq!(updates(&bob_inbox), vec![0, 1]);
}

#[actix_rt::test]
async fn external_complete_and_abort_close_the_session_once() {
    let manager = StubManager::default();
    let ended = manager.ended.clone();
    let manager_addr = manager.start();

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_secs(5),
            disconnect_grace: Duration::from_secs(5),
        },
        manager_addr.recipient(),
    );
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    session.do_send(ParticipantUp {
        identity: PlayerId::from("bob"),
    });

    session.do_send(CompleteMatch {
        result: json!({ "winner": 0 }),
    });
    // A late abort against a closed session must not produce a second
    // terminal record.
    session.do_send(AbortMatch {
        reason: "admin".to_string(),
    });
    actix_rt::time::sleep(Duration::from_millis(50)).await;

    let outcomes = ended.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0], MatchOutcome::Completed(json!({ "winner": 0 })));
}

#[actix_rt::test]
async fn disconnect_grace_tolerates_a_reconnect() {
    let manager = StubManager::default();
    let ended = manager.ended.clone();
    let manager_addr = manager.start();

    let session = start_session(
        &["ada", "bob"],
        SessionPolicy {
            forming_grace: Duration::from_secs(5),
            disconnect_grace: Duration::from_millis(200),
        },
        manager_addr.recipient(),
    );
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    session.do_send(ParticipantUp {
        identity: PlayerId::from("bob"),
    });

    // Drop and reconnect inside the grace window: the match survives.
    session.do_send(ParticipantDown {
        identity: PlayerId::from("ada"),
    });
    actix_rt::time::sleep(Duration::from_millis(100)).await;
    session.do_send(ParticipantUp {
        identity: PlayerId::from("ada"),
    });
    actix_rt::time::sleep(Duration::from_millis(300)).await;
    assert!(ended.lock().unwrap().is_empty());
    let snapshot = session.send(GetSnapshot).await.unwrap();
    assert_eq!(snapshot.status, MatchStatus::Active);

    // Drop for good: the grace elapses and the session aborts.
    session.do_send(ParticipantDown {
        identity: PlayerId::from("ada"),
    });
    actix_rt::time::sleep(Duration::from_millis(400)).await;
    let outcomes = ended.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], MatchOutcome::Aborted(_)));
}
