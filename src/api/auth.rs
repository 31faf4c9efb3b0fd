use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{ApiError, AppState};

pub(crate) const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// `Authorization: Bearer <token>` wins; otherwise `X-Admin-Token`.
pub(crate) fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.len() > 7 && value[..7].eq_ignore_ascii_case("bearer "))
        .map(|value| value[7..].trim());
    bearer.or_else(|| {
        headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    })
}

pub(crate) async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = presented_token(request.headers()) == Some(state.admin_token.as_ref());
    if !authorized {
        log::warn!("rejected {} {}: bad or missing token", request.method(), request.uri().path());
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}
