use serde::{Deserialize, Serialize};

/// Presence of a single user identity, as exposed by the read API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
    pub user_id: String,
    pub online: bool,
}

/// Gateway-wide presence counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSummary {
    pub online_users: usize,
}
