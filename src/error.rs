use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::connection::ConnId;

/// Failures raised by the gateway core (registry, rooms, router, transport).
///
/// None of these are fatal to the process: `InvalidConnection` is returned to
/// the caller of the failing operation, `MalformedEvent` is logged and the
/// event dropped. `Send` and `Encode` are only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("connection {0} is not registered")]
    InvalidConnection(ConnId),

    #[error("event {event_type} is missing targeting field `{field}`")]
    MalformedEvent { event_type: String, field: String },

    #[error("channel `{0}` is reserved")]
    ReservedChannel(String),

    #[error("channel name must not be empty")]
    InvalidChannel,

    #[error("send to connection {conn_id} failed: {reason}")]
    Send { conn_id: ConnId, reason: String },

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Short machine-readable code used in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidConnection(_) => "invalid_connection",
            GatewayError::MalformedEvent { .. } => "malformed_event",
            GatewayError::ReservedChannel(_) => "reserved_channel",
            GatewayError::InvalidChannel => "invalid_channel",
            GatewayError::Send { .. } => "send_failed",
            GatewayError::Encode(_) => "encode_failed",
        }
    }
}

/// Errors surfaced by the HTTP API.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let (AppError::BadRequest(message) | AppError::NotFound(message)) = self;
        (
            status,
            Json(json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_codes() {
        let conn = ConnId::new();
        assert_eq!(
            GatewayError::InvalidConnection(conn).code(),
            "invalid_connection"
        );
        let malformed = GatewayError::MalformedEvent {
            event_type: "notification.created".to_string(),
            field: "userId".to_string(),
        };
        assert_eq!(malformed.code(), "malformed_event");
        assert_eq!(
            malformed.to_string(),
            "event notification.created is missing targeting field `userId`"
        );

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(GatewayError::from(json_err).code(), "encode_failed");
    }

    #[test]
    fn test_app_error_status() {
        let resp = AppError::BadRequest("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = AppError::NotFound("gone".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
