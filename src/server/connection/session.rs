//! WebSocket session handler for one connected player.
//!
//! This actor is the transport end of a `Connection`: it registers itself
//! with the connection registry on start, relays client messages to the
//! matchmaking server and session manager, and serializes server messages
//! back to the client. Heartbeats bound liveness; the flood guard bounds
//! inbound volume.

use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use actix_web::http::StatusCode;
use log::{debug, info};
use std::time::Instant;
use uuid::Uuid;

use crate::config::connection::ConnectionPolicy;
use crate::core::identity::{PlayerId, PlayerProfile};
use crate::core::queue::QueueTicket;
use crate::server::connection::flood::FloodGuard;
use crate::server::connection::registry::{
    ConnectionRegistry, ConnectionToken, Register, SessionKicked, Unregister,
};
use crate::server::matchmaking::server::{CancelTicket, Enqueue, MatchmakingServer, TicketIssued};
use crate::server::messages::{ClientWsMessage, ServerWsMessage};
use crate::server::session::manager::{RouteAction, SessionManager};
use crate::server::state::AppState;
use crate::server::ws_error::{http_error_response, ws_error_message};

pub struct ClientSession {
    identity: PlayerId,
    profile: PlayerProfile,
    token: ConnectionToken,
    registry: Addr<ConnectionRegistry>,
    matchmaking: Addr<MatchmakingServer>,
    manager: Addr<SessionManager>,
    policy: ConnectionPolicy,
    flood: FloodGuard,
    ticket: Option<QueueTicket>,
    last_heartbeat: Instant,
}

impl ClientSession {
    pub fn new(
        identity: PlayerId,
        profile: PlayerProfile,
        registry: Addr<ConnectionRegistry>,
        matchmaking: Addr<MatchmakingServer>,
        manager: Addr<SessionManager>,
        policy: ConnectionPolicy,
    ) -> Self {
        let flood = FloodGuard::new(policy.max_messages_per_second, policy.flood_cooldown);
        Self {
            identity,
            profile,
            token: Uuid::new_v4(),
            registry,
            matchmaking,
            manager,
            policy,
            flood,
            ticket: None,
            last_heartbeat: Instant::now(),
        }
    }

    /// Ping the client on an interval; drop the connection once it stays
    /// silent past the liveness timeout.
    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.policy.client_timeout;
        ctx.run_interval(self.policy.heartbeat_interval, move |act, ctx| {
            if act.last_heartbeat.elapsed() > timeout {
                info!("[Connection] {} timed out, closing", act.identity);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn dispatch(&mut self, msg: ClientWsMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientWsMessage::JoinQueue { criteria } => {
                self.matchmaking.do_send(Enqueue {
                    identity: self.identity.clone(),
                    profile: self.profile.clone(),
                    criteria,
                    reply: ctx.address().recipient(),
                });
            }
            ClientWsMessage::CancelQueue => {
                if let Some(ticket) = self.ticket.take() {
                    self.matchmaking.do_send(CancelTicket {
                        identity: self.identity.clone(),
                        ticket,
                    });
                }
            }
            ClientWsMessage::SubmitAction { match_id, action } => {
                self.manager.do_send(RouteAction {
                    identity: self.identity.clone(),
                    match_id,
                    action,
                    reply: ctx.address().recipient(),
                });
            }
            ClientWsMessage::Ping => {
                // Liveness already refreshed by the read itself.
            }
        }
    }
}

impl Actor for ClientSession {
    type Context = ws::WebsocketContext<Self>;

    /// Register the connection once the socket is up.
    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        self.registry.do_send(Register {
            identity: self.identity.clone(),
            token: self.token,
            outbound: ctx.address().recipient(),
            kick: ctx.address().recipient(),
        });
        info!("[Connection] {} connected", self.identity);
    }

    /// Unregister on close. The token guard makes this a no-op when a newer
    /// session already took the slot.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.registry.do_send(Unregister {
            identity: self.identity.clone(),
            token: self.token,
        });
        debug!("[Connection] {} disconnected", self.identity);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                if !self.flood.allow(Instant::now()) {
                    // Refused silently; answering a flood would amplify it.
                    debug!("[Connection] {} over message budget", self.identity);
                    return;
                }
                match serde_json::from_str::<ClientWsMessage>(&text) {
                    Ok(parsed) => self.dispatch(parsed, ctx),
                    Err(_) => {
                        ctx.text(ws_error_message("BAD_MESSAGE", "Invalid client message"));
                    }
                }
            }
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<ServerWsMessage> for ClientSession {
    type Result = ();

    /// Serialize a server message out to the client.
    fn handle(&mut self, msg: ServerWsMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                // Serialization failure: notify and drop the connection.
                debug!("[Connection] failed to serialize server message: {}", e);
                ctx.text(ws_error_message("INTERNAL", "Internal server error"));
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some("Internal server error".into()),
                }));
                ctx.stop();
            }
        }
    }
}

impl Handler<TicketIssued> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: TicketIssued, _ctx: &mut Self::Context) {
        self.ticket = Some(msg.ticket);
    }
}

impl Handler<SessionKicked> for ClientSession {
    type Result = ();

    /// A newer connection for this identity superseded us.
    fn handle(&mut self, msg: SessionKicked, ctx: &mut Self::Context) {
        ctx.text(ws_error_message("DUPLICATE_CONNECTION", &msg.reason));
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some("Superseded by a newer connection".into()),
        }));
        ctx.stop();
    }
}

/// WebSocket endpoint. The authenticator reads the identity from the query
/// string (`player`, plus optional `username`, `rating`, `region`).
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (identity, profile) = match data.auth.authenticate(req.query_string()) {
        Ok(verified) => verified,
        Err(reason) => {
            return Ok(http_error_response(
                "AUTH_FAILED",
                &reason,
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    ws::start(
        ClientSession::new(
            identity,
            profile,
            data.registry.clone(),
            data.matchmaking.clone(),
            data.manager.clone(),
            data.connection_policy.clone(),
        ),
        &req,
        stream,
    )
}
