//! Matchmaking module: owns the pending queue and forms matches.

pub mod server;
