pub mod bus;
pub mod config;
pub mod error;
pub mod event_router;
pub mod gateway;
pub mod models;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod routes;
pub mod state;
