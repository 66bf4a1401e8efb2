//! Centralized helpers for WebSocket and HTTP error responses.
//!
//! Every error leaving the server carries a stable `code` plus a
//! human-readable message, so clients can branch without parsing text.

use actix_web::{HttpResponse, http::StatusCode};

use crate::core::error::CoreError;
use crate::server::messages::ServerWsMessage;

/// Build the wire `Error` payload for a core error.
pub fn error_payload(err: &CoreError) -> ServerWsMessage {
    ServerWsMessage::error(err.code(), err.to_string())
}

/// Raw JSON error string, for paths where serde itself may have failed.
pub fn ws_error_message(code: &str, message: &str) -> String {
    format!(
        r#"{{"action":"Error","data":{{"code":"{}","message":"{}"}}}}"#,
        code, message
    )
}

/// HTTP error response with a JSON body, for upgrade-time rejections.
pub fn http_error_response(code: &str, message: &str, status: StatusCode) -> HttpResponse {
    let body = format!(
        r#"{{"error":{{"code":"{}","message":"{}"}}}}"#,
        code, message
    );
    HttpResponse::build(status)
        .content_type("application/json")
        .body(body)
}
