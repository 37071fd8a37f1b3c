//! Channel membership for routed delivery.
//!
//! Channels are first-class here rather than borrowed from the transport's
//! own grouping, so the same membership model works over any transport.
//!
//! ```text
//! Channel: user:alice    Channel: user:bob    Channel: approvals
//! ├── conn-a             └── conn-c           ├── conn-a
//! └── conn-b                                  └── conn-c
//! ```
//!
//! A channel is created on first join and deleted as soon as its last member
//! leaves.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::GatewayError;
use crate::models::connection::ConnId;
use crate::registry::ConnectionRegistry;

/// Prefix of the canonical per-user channel.
pub const USER_CHANNEL_PREFIX: &str = "user:";

/// Name of the per-user channel every authenticated connection joins.
pub fn user_channel(user_id: &str) -> String {
    format!("{USER_CHANNEL_PREFIX}{user_id}")
}

/// Per-user channels may only be joined by the gateway itself.
pub fn is_reserved(channel: &str) -> bool {
    channel.starts_with(USER_CHANNEL_PREFIX)
}

pub struct RoomManager {
    registry: Arc<ConnectionRegistry>,
    /// channel name → member connections.
    channels: DashMap<String, HashSet<ConnId>>,
    /// connection → joined channels, for O(joined) cleanup on disconnect.
    memberships: DashMap<ConnId, HashSet<String>>,
}

impl RoomManager {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            channels: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Add `conn_id` to `channel`, creating the channel if needed.
    ///
    /// Fails with `InvalidConnection` if the connection is not registered,
    /// including when it disconnects while the join is in flight.
    pub fn join(&self, conn_id: ConnId, channel: &str) -> Result<(), GatewayError> {
        if !self.registry.contains(&conn_id) {
            return Err(GatewayError::InvalidConnection(conn_id));
        }

        {
            // The membership entry guard serializes operations on one connection.
            let mut joined = self.memberships.entry(conn_id).or_default();
            joined.insert(channel.to_string());
            self.channels
                .entry(channel.to_string())
                .or_default()
                .insert(conn_id);
        }

        // Disconnect unregisters before it clears channels, so if it raced us
        // the connection is already gone from the registry.
        if !self.registry.contains(&conn_id) {
            self.leave_all(&conn_id);
            return Err(GatewayError::InvalidConnection(conn_id));
        }

        tracing::trace!(conn_id = %conn_id, channel, "joined channel");
        Ok(())
    }

    /// Remove `conn_id` from `channel`. Unknown pairs are a no-op.
    pub fn leave(&self, conn_id: &ConnId, channel: &str) {
        let now_empty = match self.memberships.get_mut(conn_id) {
            Some(mut joined) => {
                joined.remove(channel);
                if let Some(mut members) = self.channels.get_mut(channel) {
                    members.remove(conn_id);
                }
                joined.is_empty()
            }
            None => return,
        };

        self.channels.remove_if(channel, |_, members| members.is_empty());
        if now_empty {
            self.memberships.remove_if(conn_id, |_, joined| joined.is_empty());
        }
    }

    /// Remove `conn_id` from every channel. Returns the channels it left.
    pub fn leave_all(&self, conn_id: &ConnId) -> Vec<String> {
        let Some((_, joined)) = self.memberships.remove(conn_id) else {
            return Vec::new();
        };

        for channel in &joined {
            if let Some(mut members) = self.channels.get_mut(channel) {
                members.remove(conn_id);
            }
            self.channels.remove_if(channel, |_, members| members.is_empty());
        }

        joined.into_iter().collect()
    }

    /// Snapshot of the channel's members at call time.
    pub fn members(&self, channel: &str) -> Vec<ConnId> {
        self.channels
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map(|m| m.len()).unwrap_or(0)
    }

    pub fn channels_of(&self, conn_id: &ConnId) -> Vec<String> {
        self.memberships
            .get(conn_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, conn_id: &ConnId, channel: &str) -> bool {
        self.channels
            .get(channel)
            .map(|members| members.contains(conn_id))
            .unwrap_or(false)
    }

    /// Number of non-empty channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
