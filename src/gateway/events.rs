use serde::Deserialize;

/// Names of frames the gateway itself emits (routed domain events use the
/// names from the targeting table).
pub mod event_name {
    pub const CONNECTED: &str = "connected";
    pub const SUBSCRIBED: &str = "subscribed";
    pub const UNSUBSCRIBED: &str = "unsubscribed";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
}

/// Error codes carried in `error` frames that do not come from `GatewayError`.
pub mod error_code {
    pub const DECODE_ERROR: &str = "decode_error";
    pub const UNSUPPORTED_FRAME: &str = "unsupported_frame";
}

/// Commands a client may send over an established connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientCommand {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

/// Connection-establishment metadata, taken from the upgrade query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeParams {
    #[serde(default, rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}
