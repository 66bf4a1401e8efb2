//! Client connection layer: the registry actor owning all live connections
//! and the per-client WebSocket session actor, plus the inbound flood guard.

pub mod flood;
pub mod registry;
pub mod session;
