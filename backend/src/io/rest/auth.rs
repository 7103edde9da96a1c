//! Shared-secret guard for the `/api/v1` routes.
//!
//! The caller sends the configured key in `X-API-Key`. A missing key is 401,
//! a wrong key is 403.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::ApiResponse;
use std::sync::Arc;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiKeyAuth {
    expected: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(expected: impl Into<Arc<str>>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth").field("expected", &"[redacted]").finish()
    }
}

fn reject(status: StatusCode, error: &str) -> Response {
    (status, Json(ApiResponse::<()>::error(error))).into_response()
}

pub async fn require_api_key(
    State(auth): State<ApiKeyAuth>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match provided {
        None => reject(StatusCode::UNAUTHORIZED, "API key is required"),
        Some(key) if key != &*auth.expected => {
            warn!("Rejected request to {} with an invalid API key", request.uri().path());
            reject(StatusCode::FORBIDDEN, "Invalid API key")
        }
        Some(_) => next.run(request).await,
    }
}
