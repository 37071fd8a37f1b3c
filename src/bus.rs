//! Internal domain event bus.
//!
//! Handlers register explicitly per event type at startup; publishing an
//! event invokes every handler registered for its type, in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::GatewayError;
use crate::models::event::DomainEvent;

/// Handler for one or more domain event types.
///
/// Handlers must not let one failing event affect others: errors are
/// reported back to the bus, which logs them and carries on.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: DomainEvent) -> Result<(), GatewayError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Registration side of the bus.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        for event_type in event_types {
            self.subscribe(event_type, Arc::clone(&handler));
        }
    }
}

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver `event` to its handlers. Returns how many handlers ran.
    async fn publish(&self, event: DomainEvent) -> usize;
}

/// In-process bus used by the gateway.
#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Event types with at least one handler, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        tracing::debug!(event_type, handler = handler.name(), "handler subscribed");
        self.handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> usize {
        // Clone handlers so the lock is released before awaiting.
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::trace!(event_type = %event.event_type, "no handlers for event");
            return 0;
        }

        for handler in &handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    event_type = %event.event_type,
                    handler = handler.name(),
                    "event handler failed: {e}"
                );
            }
        }

        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::connection::ConnId;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _event: DomainEvent) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "Counting"
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _event: DomainEvent) -> Result<(), GatewayError> {
            Err(GatewayError::InvalidConnection(ConnId::new()))
        }

        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    #[tokio::test]
    async fn test_publish_invokes_matching_handlers_only() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("notification.created", handler.clone());

        let ran = bus
            .publish(DomainEvent::new("notification.created", json!({})))
            .await;
        assert_eq!(ran, 1);
        let ran = bus
            .publish(DomainEvent::new("approval.updated", json!({})))
            .await;
        assert_eq!(ran, 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let bus = InMemoryEventBus::new();
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("sla.status_changed", Arc::new(Failing));
        bus.subscribe("sla.status_changed", counting.clone());

        let ran = bus
            .publish(DomainEvent::new("sla.status_changed", json!({})))
            .await;
        assert_eq!(ran, 2);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_all_registers_each_type() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe_all(&["a.one", "b.two"], handler);
        assert_eq!(bus.handler_count("a.one"), 1);
        assert_eq!(bus.handler_count("b.two"), 1);
        assert_eq!(bus.event_types(), vec!["a.one", "b.two"]);
    }
}
