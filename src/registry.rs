//! Connection registry: which user identities currently own live connections.
//!
//! The forward map (user → connections) and the reverse index
//! (connection → user) sit behind a single mutex so they can never disagree.
//! Every operation is O(1) amortized and the lock is never held across I/O.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::models::connection::ConnId;

#[derive(Default)]
struct Inner {
    users: HashMap<String, HashSet<ConnId>>,
    owners: HashMap<ConnId, String>,
}

impl Inner {
    fn detach(&mut self, conn_id: &ConnId) -> Option<String> {
        let user_id = self.owners.remove(conn_id)?;
        if let Some(conns) = self.users.get_mut(&user_id) {
            conns.remove(conn_id);
            if conns.is_empty() {
                self.users.remove(&user_id);
            }
        }
        Some(user_id)
    }
}

/// Tracks the open connections of every authenticated user.
///
/// A user entry exists if and only if at least one registered connection
/// references it.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `conn_id` under `user_id`. Idempotent.
    ///
    /// A connection owned by a different user is moved, so the reverse index
    /// always names exactly one owner.
    pub fn add_connection(&self, user_id: &str, conn_id: ConnId) {
        let mut inner = self.inner.lock();
        if let Some(owner) = inner.owners.get(&conn_id) {
            if owner == user_id {
                return;
            }
            inner.detach(&conn_id);
        }
        inner
            .users
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id);
        inner.owners.insert(conn_id, user_id.to_string());
    }

    /// Unregister `conn_id`, returning the user that owned it.
    ///
    /// Unknown ids are a no-op, so repeated calls are safe.
    pub fn remove_connection(&self, conn_id: &ConnId) -> Option<String> {
        self.inner.lock().detach(conn_id)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.lock().users.contains_key(user_id)
    }

    /// Number of distinct users with at least one open connection.
    pub fn online_users_count(&self) -> usize {
        self.inner.lock().users.len()
    }

    pub fn contains(&self, conn_id: &ConnId) -> bool {
        self.inner.lock().owners.contains_key(conn_id)
    }

    pub fn connections_of(&self, user_id: &str) -> Vec<ConnId> {
        self.inner
            .lock()
            .users
            .get(user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total registered connections across all users.
    pub fn connection_count(&self) -> usize {
        self.inner.lock().owners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_then_remove() {
        let registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        registry.add_connection("alice", conn);
        assert!(registry.is_online("alice"));
        assert!(registry.contains(&conn));
        assert_eq!(registry.online_users_count(), 1);

        assert_eq!(registry.remove_connection(&conn).as_deref(), Some("alice"));
        assert!(!registry.is_online("alice"));
        assert_eq!(registry.online_users_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        registry.add_connection("alice", conn);
        registry.add_connection("alice", conn);
        assert_eq!(registry.connections_of("alice"), vec![conn]);
        assert_eq!(registry.connection_count(), 1);

        registry.remove_connection(&conn);
        assert!(!registry.is_online("alice"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let a = ConnId::new();
        let b = ConnId::new();
        registry.add_connection("alice", a);
        registry.add_connection("bob", b);

        registry.remove_connection(&a);
        let after_once = (
            registry.is_online("alice"),
            registry.is_online("bob"),
            registry.online_users_count(),
            registry.connection_count(),
        );
        assert_eq!(registry.remove_connection(&a), None);
        let after_twice = (
            registry.is_online("alice"),
            registry.is_online("bob"),
            registry.online_users_count(),
            registry.connection_count(),
        );
        assert_eq!(after_once, after_twice);
        assert_eq!(after_twice, (false, true, 1, 1));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.remove_connection(&ConnId::new()), None);
        assert_eq!(registry.online_users_count(), 0);
    }

    #[test]
    fn test_multiple_connections_per_user() {
        let registry = ConnectionRegistry::new();
        let conn_a = ConnId::new();
        let conn_b = ConnId::new();

        registry.add_connection("alice", conn_a);
        registry.add_connection("alice", conn_b);
        assert!(registry.is_online("alice"));
        assert_eq!(registry.online_users_count(), 1);

        registry.remove_connection(&conn_a);
        assert!(registry.is_online("alice"));

        registry.remove_connection(&conn_b);
        assert!(!registry.is_online("alice"));
    }

    #[test]
    fn test_re_registering_under_other_user_moves_ownership() {
        let registry = ConnectionRegistry::new();
        let conn = ConnId::new();

        registry.add_connection("alice", conn);
        registry.add_connection("bob", conn);

        assert!(!registry.is_online("alice"));
        assert!(registry.is_online("bob"));
        assert_eq!(registry.connections_of("bob"), vec![conn]);
        assert!(registry.connections_of("alice").is_empty());
        assert_eq!(registry.online_users_count(), 1);
    }

    #[test]
    fn test_concurrent_duplicate_add_and_remove_converge() {
        for _ in 0..200 {
            let registry = Arc::new(ConnectionRegistry::new());
            let conn = ConnId::new();

            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let registry = Arc::clone(&registry);
                    std::thread::spawn(move || {
                        if i % 2 == 0 {
                            registry.add_connection("alice", conn);
                        } else {
                            registry.remove_connection(&conn);
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            // Whatever the interleaving, both indexes agree.
            assert_eq!(registry.contains(&conn), registry.is_online("alice"));
            assert_eq!(
                registry.connections_of("alice").len(),
                registry.connection_count()
            );
        }
    }
}
