//! GET /file and POST /file

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::split_keys;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct GetParams {
    id: Option<String>,
    keys: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostParams {
    id: Option<String>,
    pass: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub id: String,
    pub size: usize,
    pub content_type: String,
}

/// Serve a file to a caller presenting a set of keys.
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetParams>,
) -> Result<impl IntoResponse, ApiError> {
    let id = params
        .id
        .ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    let ticket = split_keys(params.keys.as_deref());

    let file = state.store.retrieve(&id, &ticket).await?;
    tracing::info!("Served {} ({} bytes)", file.id, file.content.len());

    Ok(([(header::CONTENT_TYPE, file.content_type)], file.content))
}

/// Store the multipart `file` field under `id`.
///
/// The shared secret is checked before the body is read.
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PostParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    if !state.is_authorized(params.pass.as_deref()) {
        return Err(ApiError::AuthDenied);
    }
    let id = params
        .id
        .ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("expected multipart body: {}", e)))?;

    let mut content = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read attachment: {}", e)))?;
            content = Some(bytes);
            break;
        }
        tracing::debug!("Ignoring multipart field {:?}", field.name());
    }
    let content = content.ok_or_else(|| ApiError::BadRequest("missing file attachment".into()))?;

    state.store.store(&id, &content).await?;

    Ok(Json(StoreResponse {
        content_type: mime_guess::from_path(&id)
            .first_or_octet_stream()
            .to_string(),
        size: content.len(),
        id,
    }))
}
