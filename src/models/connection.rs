use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one live duplex session.
///
/// Generated server-side at handshake and never reused, so a reconnecting
/// client always gets a fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConnId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle stage of a connection. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// A live connection accepted by the transport.
///
/// `user_id` is `None` for anonymous connections, which are never registered
/// for presence and never targeted by routed events.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnId,
    pub user_id: Option<String>,
    pub state: ConnectionState,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Connection {
    pub fn new(user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConnId::new(),
            user_id,
            state: ConnectionState::Connecting,
            connected_at: now,
            last_activity: now,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Normalize a handshake-supplied identity. Blank values mean anonymous.
pub fn normalize_user_id(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_ids_are_unique() {
        assert_ne!(ConnId::new(), ConnId::new());
    }

    #[test]
    fn test_conn_id_display_round_trips() {
        let id = ConnId::new();
        let parsed: ConnId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn test_normalize_user_id() {
        assert_eq!(normalize_user_id(Some("alice")), Some("alice".to_string()));
        assert_eq!(normalize_user_id(Some("  bob ")), Some("bob".to_string()));
        assert_eq!(normalize_user_id(Some("   ")), None);
        assert_eq!(normalize_user_id(None), None);
    }

    #[test]
    fn test_new_connection_starts_connecting() {
        let conn = Connection::new(None);
        assert!(conn.is_anonymous());
        assert_eq!(conn.state, ConnectionState::Connecting);
        assert_eq!(conn.connected_at, conn.last_activity);
    }
}
