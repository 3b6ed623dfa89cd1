//! GET /status (snapshot or live subscription) and POST /status

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::non_empty;
use crate::AppState;
use crate::error::ApiError;
use crate::status::{StatusHub, StatusRecord, StatusUpdate};

#[derive(Debug, Deserialize)]
pub struct UpdateParams {
    action: Option<String>,
    link: Option<String>,
    location: Option<String>,
    duration: Option<String>,
    pass: Option<String>,
}

/// Plain snapshot, or a push subscription when the connection asks to upgrade.
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(upgrade) => {
            let hub = state.hub.clone();
            upgrade.on_upgrade(move |socket| stream_status(socket, hub))
        }
        Err(_) => Json(state.hub.read()).into_response(),
    }
}

/// Replace the status and notify every subscriber.
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdateParams>,
) -> Result<Json<StatusRecord>, ApiError> {
    if !state.is_authorized(params.pass.as_deref()) {
        return Err(ApiError::AuthDenied);
    }
    let action = non_empty(params.action)
        .ok_or_else(|| ApiError::BadRequest("action is required".into()))?;

    let record = state.hub.update(StatusUpdate {
        action,
        link: non_empty(params.link),
        location: non_empty(params.location),
        duration: non_empty(params.duration),
    });
    Ok(Json(record))
}

/// Forward snapshots to one socket until either side goes away.
async fn stream_status(socket: WebSocket, hub: StatusHub) {
    let mut subscription = hub.subscribe();
    let id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            record = subscription.recv() => {
                let Some(record) = record else { break };
                let json = match serde_json::to_string(&record) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to encode status: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(json.into())).await {
                    tracing::debug!("Subscriber {} send failed: {}", id, e);
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Subscriber {} socket error: {}", id, e);
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    // Dropping the subscription deregisters it
    drop(subscription);
}
