use std::path::Path;

use axum::extract::{Path as UrlPath, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use super::{blocking, ApiError, AppState};

pub(crate) async fn index(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve(state, "index.html".to_string()).await
}

pub(crate) async fn admin(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve(state, "admin.html".to_string()).await
}

pub(crate) async fn static_file(State(state): State<AppState>, UrlPath(path): UrlPath<String>) -> Result<Response, ApiError> {
    serve(state, path).await
}

async fn serve(state: AppState, path: String) -> Result<Response, ApiError> {
    let content_type = content_type(Path::new(&path));
    let sandbox = state.sandbox.clone();
    let bytes = blocking(move || sandbox.read_bytes(&path)).await?;
    Ok(([(CONTENT_TYPE, content_type)], bytes).into_response())
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
