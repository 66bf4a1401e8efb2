//! Main configuration module.
//!
//! Re-exports submodules for matchmaking, session, broadcast, and connection
//! policy. Each submodule defines its default constants and a policy struct
//! that actors take at construction, so deployments can override any value
//! without touching the components themselves.

pub mod broadcast;
pub mod connection;
pub mod matchmaking;
pub mod session;
