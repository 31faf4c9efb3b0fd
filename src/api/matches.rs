use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::{blocking, parse_payload, ApiError, AppState};
use crate::models::MatchesDocument;

pub(crate) async fn get_matches(State(state): State<AppState>) -> Result<Json<MatchesDocument>, ApiError> {
    let store = state.store.clone();
    Ok(Json(blocking(move || store.read_matches()).await?))
}

/// Replaces the whole document. Concurrent posts race; the last rename wins.
pub(crate) async fn post_matches(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let matches: MatchesDocument = parse_payload(&body, "matches")?;
    let store = state.store.clone();
    blocking(move || store.write_matches(&matches)).await?;
    Ok(Json(json!({"ok": true})))
}
