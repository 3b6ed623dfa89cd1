//! GET /upgrade: run the configured self-update command.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tokio::process::Command;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UpgradeParams {
    pass: Option<String>,
}

/// Run the upgrade command and point the caller at the status page.
///
/// The command runs to completion with no timeout; a hang only holds this
/// request.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpgradeParams>,
) -> Result<Response, ApiError> {
    if !state.is_authorized(params.pass.as_deref()) {
        return Err(ApiError::AuthDenied);
    }

    let Some(command) = state.config.upgrade_command.as_deref() else {
        tracing::warn!("Upgrade requested but no upgrade command is configured");
        return Ok("not yet implemented".into_response());
    };

    tracing::info!("Upgrading the server...");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .with_context(|| format!("Failed to launch upgrade command: {}", command))?;

    if output.status.success() {
        tracing::info!("Upgrade command finished");
        Ok(Redirect::permanent("/status").into_response())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ApiError::Internal(anyhow::anyhow!(
            "upgrade command exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}
