mod events;
mod health;
mod presence;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .route("/ws", get(crate::gateway::ws_upgrade))
        .nest("/api/v1", api_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Presence (read-only)
        .route("/presence", get(presence::get_summary))
        .route("/presence/{user_id}", get(presence::get_user_presence))
        // Domain event ingress onto the internal bus
        .route("/events", post(events::publish_event))
}

async fn not_found() -> AppError {
    AppError::NotFound("no such route".to_string())
}
