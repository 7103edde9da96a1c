//! # REST API Interface Layer
//!
//! HTTP endpoints for the herd record store, mounted under `/api/v1`.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: one `*_apis` module per record type
//! - **Error Handling**: [`StoreError`] to status code, in [`error_response`]
//! - **Actor Attribution**: the `X-User` header, read by [`actor`]
//! - **Authentication**: the `X-API-Key` guard in [`auth`]

pub mod activity_apis;
pub mod auth;
pub mod cattle_apis;
pub mod health_apis;
pub mod image_apis;
pub mod milk_apis;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::error::StoreError;
use shared::{ApiResponse, ValidationError};

pub const USER_HEADER: &str = "x-user";

/// Acting user named by the `X-User` header, if any
pub fn actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// JSON request body. The content type is not checked, an empty body reads
/// as `{}`, and every rejection is answered in the response envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                warn!("Unreadable request body: {}", rejection.body_text());
                let body = ApiResponse::<()>::error(rejection.body_text());
                return Err((rejection.status(), Json(body)).into_response());
            }
        };
        parse_body(&bytes)
            .map(JsonBody)
            .map_err(|e| error_response(&e, "Invalid request body", false))
    }
}

pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Validation(ValidationError::InvalidBody(e.to_string())))
}

pub fn data_response<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::ok(data))).into_response()
}

pub fn message_response(message: &str) -> Response {
    (StatusCode::OK, Json(ApiResponse::message(message))).into_response()
}

pub fn error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation(_) | StoreError::NoOp => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Storage(_) | StoreError::Io(_) | StoreError::Corrupt(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Envelope for a failed operation. Client errors carry their own message;
/// server errors carry `failure` and expose the cause only when `expose`.
pub fn error_response(err: &StoreError, failure: &str, expose: bool) -> Response {
    let status = error_status(err);
    let body = if err.is_client_error() {
        ApiResponse::<()>::error(err.to_string())
    } else {
        error!("{}: {}", failure, err);
        if expose {
            ApiResponse::error_with_message(failure, err.to_string())
        } else {
            ApiResponse::error(failure)
        }
    };
    (status, Json(body)).into_response()
}

/// Fallback for any unrouted path
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("Endpoint not found")),
    )
        .into_response()
}
