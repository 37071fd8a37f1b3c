use axum::extract::{Path, State};
use axum::Json;

use crate::models::presence::{PresenceSummary, UserPresence};
use crate::models::DataResponse;
use crate::state::AppState;

pub async fn get_user_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<DataResponse<UserPresence>> {
    Json(DataResponse::new(state.presence.user_presence(&user_id)))
}

pub async fn get_summary(State(state): State<AppState>) -> Json<DataResponse<PresenceSummary>> {
    Json(DataResponse::new(state.presence.summary()))
}
