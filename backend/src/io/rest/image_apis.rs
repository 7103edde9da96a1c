//! # REST API for Uploaded Images
//!
//! Uploads arrive as `multipart/form-data` with the image in the `file`
//! field. Stored files are served publicly under `/uploads`.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use super::{data_response, error_response, message_response};
use crate::domain::UploadedFile;
use crate::error::StoreError;
use crate::AppState;
use shared::{ApiResponse, ValidationError};

const FILE_FIELD: &str = "file";

/// Base for public image URLs: the configured one, else the request host.
fn base_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = public_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

async fn read_file_field(
    multipart: &mut Multipart,
    max_file_size: usize,
) -> Result<Option<UploadedFile>, StoreError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(multipart_error(e, max_file_size)),
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?;
        return Ok(Some(UploadedFile {
            original_name,
            mimetype,
            bytes: bytes.to_vec(),
        }));
    }
}

fn multipart_error(err: MultipartError, max_file_size: usize) -> StoreError {
    warn!("Rejected multipart body: {}", err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::FileTooLarge(max_file_size).into()
    } else {
        ValidationError::MissingFile.into()
    }
}

pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    info!("POST /api/v1/images/upload");
    let expose = state.config.is_development();
    let max_file_size = state.image_service.max_file_size();

    let file = match read_file_field(&mut multipart, max_file_size).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(ValidationError::MissingFile.to_string())),
            )
                .into_response()
        }
        Err(e) => return error_response(&e, "Failed to upload image", expose),
    };

    let base = base_url(state.config.public_url.as_deref(), &headers);
    match state.image_service.upload(file, &base).await {
        Ok(upload) => data_response(StatusCode::CREATED, upload),
        Err(e) => error_response(&e, "Failed to upload image", expose),
    }
}

pub async fn get_image_info(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/images/{}", filename);

    match state.image_service.image_info(&filename).await {
        Ok(info) => data_response(StatusCode::OK, info),
        Err(e) => error_response(&e, "Failed to get image info", state.config.is_development()),
    }
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/v1/images/{}", filename);

    match state.image_service.delete_image(&filename).await {
        Ok(()) => message_response("Image deleted successfully"),
        Err(e) => error_response(&e, "Failed to delete image", state.config.is_development()),
    }
}
