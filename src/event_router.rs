//! Routes domain events from the internal bus to gateway channels.
//!
//! ```text
//! DomainEvent ──► targeting table ──► recipients ──► Transport::send
//!                  (ROUTES)            user:{id} channels, or broadcast
//! ```
//!
//! The router trusts the bus payload. It only checks that the targeting field
//! is present and well-formed; anything else is dropped with a warning.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bus::{EventHandler, EventSubscriber};
use crate::error::GatewayError;
use crate::gateway::transport::Transport;
use crate::models::connection::normalize_user_id;
use crate::models::event::DomainEvent;
use crate::rooms::user_channel;

/// Who receives a routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Per-user channel of the id in this data field.
    User(&'static str),
    /// Per-user channel of every id in this list field.
    Users(&'static str),
    /// Every authenticated connection.
    Broadcast,
}

/// One row of the targeting table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub event_type: &'static str,
    pub outbound: &'static str,
    pub target: Target,
    /// Data field sent as the payload when present; otherwise all of `data`.
    pub payload_field: Option<&'static str>,
}

pub const ROUTES: &[Route] = &[
    Route {
        event_type: "notification.created",
        outbound: "notification:new",
        target: Target::User("userId"),
        payload_field: Some("notification"),
    },
    Route {
        event_type: "notification.read",
        outbound: "notification:read",
        target: Target::User("userId"),
        payload_field: None,
    },
    Route {
        event_type: "notifications.all_read",
        outbound: "notifications:all_read",
        target: Target::User("userId"),
        payload_field: None,
    },
    Route {
        event_type: "approval.updated",
        outbound: "approval:updated",
        target: Target::Broadcast,
        payload_field: Some("approval"),
    },
    Route {
        event_type: "approval.created",
        outbound: "approval:assigned",
        target: Target::Users("assignedTo"),
        payload_field: Some("approval"),
    },
    Route {
        event_type: "sla.status_changed",
        outbound: "sla:status_changed",
        target: Target::User("userId"),
        payload_field: None,
    },
];

pub fn route_for(event_type: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.event_type == event_type)
}

/// Resolved recipients of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    Users(Vec<String>),
    Broadcast,
}

impl Route {
    pub fn resolve(&self, event: &DomainEvent) -> Result<Recipients, GatewayError> {
        match self.target {
            Target::Broadcast => Ok(Recipients::Broadcast),
            Target::User(field) => event
                .data
                .get(field)
                .and_then(user_id_of)
                .map(|user_id| Recipients::Users(vec![user_id]))
                .ok_or_else(|| malformed(event, field)),
            Target::Users(field) => {
                let list = event
                    .data
                    .get(field)
                    .and_then(Value::as_array)
                    .ok_or_else(|| malformed(event, field))?;

                let mut seen = HashSet::new();
                let mut users = Vec::with_capacity(list.len());
                for entry in list {
                    match user_id_of(entry) {
                        Some(user_id) => {
                            if seen.insert(user_id.clone()) {
                                users.push(user_id);
                            }
                        }
                        None => tracing::warn!(
                            event_type = %event.event_type,
                            field,
                            "skipping invalid recipient {entry}"
                        ),
                    }
                }
                Ok(Recipients::Users(users))
            }
        }
    }

    pub fn payload(&self, event: &DomainEvent) -> Value {
        self.payload_field
            .and_then(|field| event.data.get(field))
            .filter(|value| !value.is_null())
            .unwrap_or(&event.data)
            .clone()
    }
}

fn malformed(event: &DomainEvent, field: &str) -> GatewayError {
    GatewayError::MalformedEvent {
        event_type: event.event_type.clone(),
        field: field.to_string(),
    }
}

/// Accept string or integer ids, normalized the same way as handshake
/// identities so both sides name the same per-user channel.
fn user_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_user_id(Some(s.as_str())),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

pub struct EventRouter {
    transport: Arc<Transport>,
}

impl EventRouter {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn new_shared(transport: Arc<Transport>) -> Arc<Self> {
        Arc::new(Self::new(transport))
    }

    /// Register one handler per row of the targeting table.
    pub fn register(self: &Arc<Self>, subscriber: &impl EventSubscriber) {
        for route in ROUTES {
            subscriber.subscribe(
                route.event_type,
                Arc::new(RouteHandler {
                    route,
                    router: Arc::clone(self),
                }),
            );
        }
    }

    /// Fan `event` out per `route`. Malformed events are logged and dropped.
    ///
    /// Returns the number of delivery attempts made.
    pub fn dispatch(&self, route: &Route, event: &DomainEvent) -> usize {
        let recipients = match route.resolve(event) {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::warn!(event_type = %event.event_type, "dropping event: {e}");
                return 0;
            }
        };

        let payload = route.payload(event);
        match recipients {
            Recipients::Broadcast => {
                tracing::debug!(event_type = %event.event_type, outbound = route.outbound, "broadcasting");
                self.transport.broadcast(route.outbound, &payload);
                1
            }
            Recipients::Users(users) => {
                if users.is_empty() {
                    tracing::debug!(event_type = %event.event_type, "event has no recipients");
                }
                // One independent attempt per recipient; the transport swallows
                // per-connection failures.
                for user_id in &users {
                    tracing::debug!(
                        event_type = %event.event_type,
                        outbound = route.outbound,
                        user_id = %user_id,
                        "routing to user"
                    );
                    self.transport
                        .send(&user_channel(user_id), route.outbound, &payload);
                }
                users.len()
            }
        }
    }
}

struct RouteHandler {
    route: &'static Route,
    router: Arc<EventRouter>,
}

#[async_trait]
impl EventHandler for RouteHandler {
    async fn handle(&self, event: DomainEvent) -> Result<(), GatewayError> {
        self.router.dispatch(self.route, &event);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EventRouter"
    }
}
