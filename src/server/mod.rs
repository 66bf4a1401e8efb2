//! Server layer root module.
//!
//! This module organizes the actor system and its WebSocket surface:
//! - Connection registry and per-client session actors
//! - Matchmaking server (pending queue, pairing sweeps)
//! - Session manager and per-match session actors
//! - Broadcast scheduler (fixed-tick state fan-out)
//! - Routing, shared state, and error helpers

pub mod auth;
pub mod broadcast;
pub mod connection;
pub mod matchmaking;
pub mod messages;
pub mod router;
pub mod session;
pub mod state;
pub mod ws_error;
