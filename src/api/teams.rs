use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::{blocking, parse_payload, ApiError, AppState};
use crate::models::TeamsDocument;

pub(crate) async fn get_teams(State(state): State<AppState>) -> Result<Json<TeamsDocument>, ApiError> {
    let store = state.store.clone();
    Ok(Json(blocking(move || store.read_teams()).await?))
}

pub(crate) async fn post_teams(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let teams: TeamsDocument = parse_payload(&body, "teams")?;
    let store = state.store.clone();
    blocking(move || store.write_teams(&teams)).await?;
    Ok(Json(json!({"ok": true})))
}
