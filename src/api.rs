use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::config::ServerConfig;
use crate::files::Sandbox;
use crate::store::DataStore;

mod auth;
mod error;
mod fs;
mod matches;
mod site;
mod teams;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub(crate) store: DataStore,
    pub(crate) sandbox: Sandbox,
    pub(crate) admin_token: Arc<str>,
}

impl AppState {
    pub fn new(store: DataStore, sandbox: Sandbox, admin_token: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            sandbox,
            admin_token: admin_token.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> std::io::Result<Self> {
        Ok(Self::new(
            DataStore::new(&config.data_dir),
            Sandbox::new(&config.site_root)?,
            config.admin_token.as_str(),
        ))
    }
}

pub fn build_router(state: AppState, upload_limit: usize) -> Router {
    let api = Router::new()
        .route("/api/teams", get(teams::get_teams).post(teams::post_teams))
        .route(
            "/api/matches",
            get(matches::get_matches).post(matches::post_matches),
        )
        .route("/api/fs/list", get(fs::list))
        .route("/api/fs/file", get(fs::read_file).post(fs::write_file))
        .route("/api/fs/upload", post(fs::upload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .merge(api)
        .route("/", get(site::index))
        .route("/admin", get(site::admin))
        .route("/*path", get(site::static_file))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

/// Runs filesystem work off the async executor.
pub(crate) async fn blocking<T, E>(work: impl FnOnce() -> Result<T, E> + Send + 'static) -> Result<T, ApiError>
where
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(Into::into)
}

/// Document bodies must be JSON objects carrying `key`; anything else is
/// `invalid_payload` rather than a framework rejection.
pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(body: &[u8], key: &str) -> Result<T, ApiError> {
    let hint = format!("Expected object with '{key}'.");
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidPayload {
        hint: hint.clone(),
    })?;
    if !value.as_object().is_some_and(|object| object.contains_key(key)) {
        return Err(ApiError::InvalidPayload { hint });
    }
    serde_json::from_value(value).map_err(|err| ApiError::InvalidPayload {
        hint: format!("{hint} {err}"),
    })
}
