use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::bus::EventPublisher;
use crate::error::AppError;
use crate::models::event::DomainEvent;
use crate::models::DataResponse;
use crate::state::AppState;

/// Feed a domain event onto the internal bus.
pub async fn publish_event(
    State(state): State<AppState>,
    body: Result<Json<DomainEvent>, axum::extract::rejection::JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<serde_json::Value>>), AppError> {
    let Json(event) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if event.event_type.trim().is_empty() {
        return Err(AppError::BadRequest("event type must not be empty".to_string()));
    }

    let event_type = event.event_type.clone();
    let handlers = state.bus.publish(event).await;
    tracing::debug!(event_type = %event_type, handlers, "event published");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::new(serde_json::json!({
            "type": event_type,
            "handlers": handlers
        }))),
    ))
}
