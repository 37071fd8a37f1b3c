use std::sync::Arc;

use crate::bus::InMemoryEventBus;
use crate::config::Config;
use crate::event_router::EventRouter;
use crate::gateway::heartbeat::Heartbeat;
use crate::gateway::transport::Transport;
use crate::presence::PresenceService;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomManager;

/// Process-wide gateway components, built once at startup and shared by
/// reference with every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomManager>,
    pub transport: Arc<Transport>,
    pub presence: PresenceService,
    pub bus: Arc<InMemoryEventBus>,
    pub heartbeat: Heartbeat,
}

impl AppState {
    /// Wire the components together and register the event router on the bus.
    pub fn new(heartbeat: Heartbeat) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(Arc::clone(&registry)));
        let transport = Arc::new(Transport::new(Arc::clone(&registry), Arc::clone(&rooms)));
        let presence = PresenceService::new(Arc::clone(&registry));
        let bus = Arc::new(InMemoryEventBus::new());

        EventRouter::new_shared(Arc::clone(&transport)).register(bus.as_ref());

        Self {
            registry,
            rooms,
            transport,
            presence,
            bus,
            heartbeat,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.heartbeat)
    }
}
