use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::GatewayError;
use crate::models::connection::{normalize_user_id, ConnId, Connection, ConnectionState};
use crate::models::event::OutboundEvent;
use crate::registry::ConnectionRegistry;
use crate::rooms::{self, RoomManager};

use super::events::HandshakeParams;
use super::session::{ConnectionSink, GatewaySession};

/// Owns the live sessions and turns channel sends into per-connection frames.
pub struct Transport {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    sessions: DashMap<ConnId, GatewaySession>,
}

impl Transport {
    pub fn new(registry: Arc<ConnectionRegistry>, rooms: Arc<RoomManager>) -> Self {
        Self {
            registry,
            rooms,
            sessions: DashMap::new(),
        }
    }

    /// Accept a new connection.
    ///
    /// With a user identity the connection is registered for presence and
    /// joined to that user's channel; without one it stays anonymous and is
    /// invisible to presence and routing.
    pub fn handshake(&self, params: &HandshakeParams, sink: Arc<dyn ConnectionSink>) -> Connection {
        let mut connection = Connection::new(normalize_user_id(params.user_id.as_deref()));
        connection.state = ConnectionState::Connected;
        let conn_id = connection.id;

        self.sessions.insert(
            conn_id,
            GatewaySession {
                connection: connection.clone(),
                sink,
            },
        );

        match &connection.user_id {
            Some(user_id) => {
                self.registry.add_connection(user_id, conn_id);
                if let Err(e) = self.rooms.join(conn_id, &rooms::user_channel(user_id)) {
                    tracing::debug!(conn_id = %conn_id, "user channel join skipped: {e}");
                }
                tracing::info!(conn_id = %conn_id, user_id = %user_id, "connection accepted");
            }
            None => {
                tracing::info!(conn_id = %conn_id, "anonymous connection accepted");
            }
        }

        connection
    }

    /// Deliver `event_name` to every member of `channel` at call time.
    ///
    /// Fire-and-forget: members that vanished are skipped and per-recipient
    /// failures are logged, never returned.
    pub fn send(&self, channel: &str, event_name: &str, payload: &Value) {
        let members = self.rooms.members(channel);
        if members.is_empty() {
            tracing::trace!(channel, event = event_name, "no members, nothing to send");
            return;
        }

        let Some(frame) = encode(event_name, payload) else {
            return;
        };
        for conn_id in members {
            self.deliver(conn_id, &frame);
        }
    }

    /// Deliver to every authenticated connection.
    pub fn broadcast(&self, event_name: &str, payload: &Value) {
        let Some(frame) = encode(event_name, payload) else {
            return;
        };
        let targets: Vec<ConnId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().connection.user_id.is_some())
            .map(|entry| *entry.key())
            .collect();
        for conn_id in targets {
            self.deliver(conn_id, &frame);
        }
    }

    /// Push a frame to one connection, e.g. a command reply.
    pub fn send_to(&self, conn_id: &ConnId, event: &OutboundEvent) -> Result<(), GatewayError> {
        self.try_deliver(*conn_id, &event.to_frame()?)
    }

    fn deliver(&self, conn_id: ConnId, frame: &str) {
        if let Err(e) = self.try_deliver(conn_id, frame) {
            tracing::debug!(conn_id = %conn_id, "dropping frame: {e}");
        }
    }

    fn try_deliver(&self, conn_id: ConnId, frame: &str) -> Result<(), GatewayError> {
        // Clone the sink so no map guard is held while delivering.
        let sink = match self.sessions.get(&conn_id) {
            Some(session) => Arc::clone(&session.sink),
            None => return Err(GatewayError::InvalidConnection(conn_id)),
        };
        sink.deliver(frame).map_err(|e| GatewayError::Send {
            conn_id,
            reason: e.to_string(),
        })
    }

    /// Explicit subscribe from a client.
    pub fn subscribe(&self, conn_id: ConnId, channel: &str) -> Result<(), GatewayError> {
        let channel = validate_channel(channel)?;
        self.rooms.join(conn_id, channel)?;
        tracing::debug!(conn_id = %conn_id, channel, "subscribed");
        Ok(())
    }

    pub fn unsubscribe(&self, conn_id: &ConnId, channel: &str) -> Result<(), GatewayError> {
        let channel = validate_channel(channel)?;
        self.rooms.leave(conn_id, channel);
        tracing::debug!(conn_id = %conn_id, channel, "unsubscribed");
        Ok(())
    }

    /// Record inbound activity on a connection.
    pub fn touch(&self, conn_id: &ConnId) {
        if let Some(mut session) = self.sessions.get_mut(conn_id) {
            session.connection.touch();
        }
    }

    /// Tear down all state for a connection. Safe to call more than once.
    ///
    /// Returns the closed connection in its terminal `Disconnected` state, or
    /// `None` if it was already gone. The registry is cleared before channel
    /// membership so that a join racing this call observes the connection as
    /// gone and undoes itself.
    pub fn on_disconnect(&self, conn_id: &ConnId) -> Option<Connection> {
        let removed = self.sessions.remove(conn_id);
        let user_id = self.registry.remove_connection(conn_id);
        let left = self.rooms.leave_all(conn_id);

        let (_, session) = removed?;
        let mut connection = session.connection;
        connection.state = ConnectionState::Disconnected;
        tracing::info!(
            conn_id = %conn_id,
            user_id = user_id.as_deref().unwrap_or("-"),
            channels = left.len(),
            state = ?connection.state,
            "connection closed"
        );
        Some(connection)
    }

    pub fn connection(&self, conn_id: &ConnId) -> Option<Connection> {
        self.sessions
            .get(conn_id)
            .map(|session| session.connection.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

fn encode(event_name: &str, payload: &Value) -> Option<String> {
    match OutboundEvent::new(event_name, payload.clone()).to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(event = event_name, "dropping unencodable event: {e}");
            None
        }
    }
}

fn validate_channel(channel: &str) -> Result<&str, GatewayError> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err(GatewayError::InvalidChannel);
    }
    if rooms::is_reserved(channel) {
        return Err(GatewayError::ReservedChannel(channel.to_string()));
    }
    Ok(channel)
}
