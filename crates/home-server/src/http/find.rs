//! GET /find

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::resolver::{parse_roots, resolve};

#[derive(Debug, Deserialize)]
pub struct FindParams {
    name: Option<String>,
    among: Option<String>,
}

/// Resolve a display name among the notes linked from `among`.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FindParams>,
) -> Result<impl IntoResponse, ApiError> {
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("name is required".into()))?;
    let roots = parse_roots(params.among.as_deref().unwrap_or(""));

    let file = resolve(&state.store, &name, &roots).await?;
    tracing::info!("Found '{}' as {}", name, file.id);

    let content_type = if note_fs::is_note(&file.id) {
        "text/markdown; charset=utf-8".to_string()
    } else {
        file.content_type
    };
    Ok(([(header::CONTENT_TYPE, content_type)], file.content))
}
