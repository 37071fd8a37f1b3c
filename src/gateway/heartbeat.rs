use std::time::Duration;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// Liveness settings for gateway connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often the socket task checks for inactivity.
    pub interval: Duration,
    /// A connection with no inbound frame for this long is closed.
    pub timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval: HEARTBEAT_INTERVAL,
            timeout: HEARTBEAT_TIMEOUT,
        }
    }
}
