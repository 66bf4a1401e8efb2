//! Application state for the backend server.
//!
//! Holds the actor addresses and collaborators the WebSocket endpoint needs
//! to spin up a client session. Shared between HTTP workers; the actors
//! themselves own all mutable state.

use actix::Addr;
use std::sync::Arc;

use crate::config::connection::ConnectionPolicy;
use crate::server::auth::Authenticator;
use crate::server::connection::registry::ConnectionRegistry;
use crate::server::matchmaking::server::MatchmakingServer;
use crate::server::session::manager::SessionManager;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    pub registry: Addr<ConnectionRegistry>,
    pub matchmaking: Addr<MatchmakingServer>,
    pub manager: Addr<SessionManager>,
    pub auth: Arc<dyn Authenticator>,
    pub connection_policy: ConnectionPolicy,
}

impl AppState {
    pub fn new(
        registry: Addr<ConnectionRegistry>,
        matchmaking: Addr<MatchmakingServer>,
        manager: Addr<SessionManager>,
        auth: Arc<dyn Authenticator>,
        connection_policy: ConnectionPolicy,
    ) -> Self {
        AppState {
            registry,
            matchmaking,
            manager,
            auth,
            connection_policy,
        }
    }
}
