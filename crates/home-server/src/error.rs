//! HTTP-facing error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::resolver::ResolveError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or wrong credential, or a ticket that does not unlock the file
    #[error("access denied")]
    AuthDenied,
    /// Missing file, note or route
    #[error("not found")]
    NotFound,
    /// Malformed request or upload
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::AuthDenied => (StatusCode::FORBIDDEN, "ACCESS DENIED").into_response(),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND").into_response(),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, format!("BAD REQUEST: {}", msg)).into_response()
            }
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error").into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidIdentifier { .. } => ApiError::BadRequest(e.to_string()),
            StoreError::Denied { .. } => ApiError::AuthDenied,
            StoreError::NotFound { .. } => ApiError::NotFound,
            StoreError::Access(_) | StoreError::Io(_) => ApiError::Internal(e.into()),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound { .. }
            | ResolveError::RootUnreadable { .. }
            | ResolveError::RootMalformed { .. } => {
                tracing::debug!("Find failed: {}", e);
                ApiError::NotFound
            }
            ResolveError::Store(e) => e.into(),
        }
    }
}
