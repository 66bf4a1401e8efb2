//! HTTP and WebSocket routing configuration.
//!
//! A single WebSocket endpoint carries the whole protocol: queueing,
//! match notifications, actions, and state updates all flow over one
//! connection per player.

use actix_web::web;

use crate::server::connection::session::ws_connect;

/// Configure the application's routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").to(ws_connect));
}
