use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::files::{FsError, UploadError};
use crate::store::StoreError;

/// Everything the API reports. The `error` field of the JSON body is the
/// stable code clients switch on.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid_path")]
    InvalidPath,
    #[error("not_found")]
    NotFound,
    #[error("missing_path")]
    MissingPath,
    #[error("missing_content")]
    MissingContent,
    #[error("missing_file")]
    MissingFile,
    #[error("invalid_file")]
    InvalidFile,
    #[error("invalid_payload")]
    InvalidPayload { hint: String },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidPath => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MissingPath
            | ApiError::MissingContent
            | ApiError::MissingFile
            | ApiError::InvalidFile
            | ApiError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::InvalidPayload { hint } => json!({"error": self.to_string(), "hint": hint}),
            ApiError::Internal(message) => {
                log::error!("{message}");
                json!({"error": message})
            }
            _ => json!({"error": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::InvalidPath => ApiError::InvalidPath,
            FsError::NotFound => ApiError::NotFound,
            FsError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::EmptyContent | UploadError::MissingFilename => ApiError::InvalidFile,
            UploadError::Fs(err) => err.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
