//! Main entry point for the backend server.
//!
//! Initializes the actor system (connection registry, matchmaking server,
//! session manager, broadcast scheduler), wires their subscriptions, and
//! launches the HTTP server with the WebSocket endpoint.

use actix::Actor;
use actix_web::{App, HttpServer, web};
use std::sync::Arc;

use crate::config::broadcast::BroadcastPolicy;
use crate::config::connection::ConnectionPolicy;
use crate::config::matchmaking::MatchmakingPolicy;
use crate::config::session::SessionPolicy;
use crate::core::archive::{LogArchive, MatchArchive};
use crate::core::rules::{GridWalkRules, RuleSet};
use crate::server::broadcast::BroadcastScheduler;
use crate::server::connection::registry::{ConnectionRegistry, Subscribe};
use crate::server::matchmaking::server::MatchmakingServer;
use crate::server::session::manager::{LogHook, SessionManager};

pub mod config;
mod core;
mod server;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::init();

    // Collaborators: gameplay rules and match persistence.
    let rules: Arc<dyn RuleSet> = Arc::new(GridWalkRules::default());
    let archive: Arc<dyn MatchArchive> = Arc::new(LogArchive);

    // Start the connection registry (owns all live connections).
    let registry = ConnectionRegistry::new().start();

    // Start the broadcast scheduler (fixed-tick state fan-out).
    let scheduler = BroadcastScheduler::new(
        BroadcastPolicy::default(),
        registry.clone().recipient(),
    )
    .start();

    // Start the session manager (owns all active match sessions).
    let manager = SessionManager::new(
        rules,
        archive,
        vec![Box::new(LogHook)],
        SessionPolicy::default(),
        registry.clone().recipient(),
        registry.clone().recipient(),
        scheduler.clone().recipient(),
        scheduler.clone().recipient(),
    )
    .start();

    // Start the matchmaking server (owns the pending queue).
    let matchmaking = MatchmakingServer::new(
        MatchmakingPolicy::default(),
        registry.clone().recipient(),
        manager.clone().recipient(),
    )
    .start();

    // Connectivity events drive queue removal, session grace timers, and
    // broadcast ledger resets.
    registry.do_send(Subscribe(matchmaking.clone().recipient()));
    registry.do_send(Subscribe(manager.clone().recipient()));
    registry.do_send(Subscribe(scheduler.clone().recipient()));

    // Shared application state for the WebSocket endpoint.
    let state = web::Data::new(server::state::AppState::new(
        registry,
        matchmaking,
        manager,
        Arc::new(server::auth::QueryAuth),
        ConnectionPolicy::default(),
    ));

    // Start the HTTP server with the WebSocket endpoint.
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
