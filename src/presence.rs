use std::sync::Arc;

use crate::models::presence::{PresenceSummary, UserPresence};
use crate::registry::ConnectionRegistry;

/// Read-only presence queries for the rest of the application.
#[derive(Clone)]
pub struct PresenceService {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceService {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.registry.is_online(user_id)
    }

    pub fn online_users_count(&self) -> usize {
        self.registry.online_users_count()
    }

    pub fn user_presence(&self, user_id: &str) -> UserPresence {
        UserPresence {
            user_id: user_id.to_string(),
            online: self.is_user_online(user_id),
        }
    }

    pub fn summary(&self) -> PresenceSummary {
        PresenceSummary {
            online_users: self.online_users_count(),
        }
    }
}
