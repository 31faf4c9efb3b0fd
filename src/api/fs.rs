use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct PathQuery {
    path: Option<String>,
}

impl PathQuery {
    fn required(self) -> Result<String, ApiError> {
        self.path
            .filter(|path| !path.trim().is_empty())
            .ok_or(ApiError::MissingPath)
    }
}

pub(crate) async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let sandbox = state.sandbox.clone();
    let files = blocking(move || sandbox.list()).await?;
    Ok(Json(json!({ "files": files })))
}

pub(crate) async fn read_file(State(state): State<AppState>, Query(query): Query<PathQuery>) -> Result<Json<Value>, ApiError> {
    let path = query.required()?;
    let sandbox = state.sandbox.clone();
    let content = blocking(move || sandbox.read(&path)).await?;
    Ok(Json(json!({ "content": content })))
}

pub(crate) async fn write_file(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let path = query.required()?;
    let content = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|payload| payload.get("content")?.as_str().map(str::to_string))
        .ok_or(ApiError::MissingContent)?;
    let sandbox = state.sandbox.clone();
    blocking(move || sandbox.write(&path, content.as_bytes())).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Multipart form with a `file` part and an optional `path` part.
pub(crate) async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::MissingFile)?;
    let mut target: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::InvalidFile)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(|_| ApiError::InvalidFile)?;
                file = Some((filename, content));
            }
            "path" => {
                target = Some(field.text().await.map_err(|_| ApiError::InvalidFile)?);
            }
            _ => {}
        }
    }
    let (filename, content) = file.ok_or(ApiError::MissingFile)?;
    let sandbox = state.sandbox.clone();
    let path = blocking(move || sandbox.upload(target.as_deref(), &content, &filename)).await?;
    Ok(Json(json!({ "ok": true, "path": path })))
}
