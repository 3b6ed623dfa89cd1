//! HTTP surface: routes, audit logging and the not-found fallback.

mod file;
mod find;
mod status;
mod upgrade;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::error::ApiError;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/file", get(file::get_handler).post(file::post_handler))
        .route("/find", get(find::handler))
        .route("/status", get(status::get_handler).post(status::post_handler))
        .route("/upgrade", get(upgrade::handler))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(middleware::from_fn(audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Record every denial and miss with method, path and query.
async fn audit(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = redact_query(request.uri().query().unwrap_or(""));

    let response = next.run(request).await;

    match response.status() {
        StatusCode::FORBIDDEN => {
            tracing::warn!("Access denied to {} {} with query {}", method, path, query);
        }
        StatusCode::NOT_FOUND => {
            tracing::warn!("Not found {} {} with query {}", method, path, query);
        }
        StatusCode::BAD_REQUEST => {
            tracing::info!("Bad request {} {} with query {}", method, path, query);
        }
        _ => {}
    }

    response
}

/// Blank out the value of any `pass` parameter before it reaches the logs.
fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("pass", _)) => "pass=***",
            _ => pair,
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a comma-separated key list, dropping blanks.
fn split_keys(keys: Option<&str>) -> Vec<String> {
    keys.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Treat empty query values as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query_hides_pass() {
        assert_eq!(redact_query("id=a.pdf&pass=hunter2"), "id=a.pdf&pass=***");
        assert_eq!(redact_query("passport=x"), "passport=x");
        assert_eq!(redact_query(""), "");
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(split_keys(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(split_keys(None).is_empty());
    }
}
