use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

use shared::{ImageInfo, ImageUpload, ValidationError};

use crate::error::StoreResult;
use crate::storage::ImageStorage;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

/// Extension for the stored file: the original one lowercased, or one
/// derived from the mime type when the original name has none.
fn stored_extension(original_name: &str, mimetype: &str) -> String {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match from_name {
        Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
        None => match mimetype {
            "image/jpeg" => ".jpg".to_string(),
            "image/png" => ".png".to_string(),
            "image/gif" => ".gif".to_string(),
            "image/webp" => ".webp".to_string(),
            _ => String::new(),
        },
    }
}

/// Accepts image uploads and serves their metadata
#[derive(Clone)]
pub struct ImageService<S: ImageStorage> {
    store: S,
    max_file_size: usize,
}

impl<S: ImageStorage> ImageService<S> {
    pub fn new(store: S, max_file_size: usize) -> Self {
        Self { store, max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Store `file` under a fresh name; the returned URL is rooted at `base_url`
    pub async fn upload(&self, file: UploadedFile, base_url: &str) -> StoreResult<ImageUpload> {
        if !ALLOWED_IMAGE_TYPES.contains(&file.mimetype.as_str()) {
            warn!("Rejected upload {} of type {}", file.original_name, file.mimetype);
            return Err(ValidationError::UnsupportedImageType(file.mimetype).into());
        }
        if file.bytes.len() > self.max_file_size {
            warn!("Rejected upload {} of {} bytes", file.original_name, file.bytes.len());
            return Err(ValidationError::FileTooLarge(self.max_file_size).into());
        }

        let filename = format!(
            "{}{}",
            Uuid::new_v4(),
            stored_extension(&file.original_name, &file.mimetype)
        );
        self.store.save_image(&filename, &file.bytes).await?;
        info!("Uploaded {} as {}", file.original_name, filename);

        Ok(ImageUpload {
            url: format!("{}/uploads/{}", base_url.trim_end_matches('/'), filename),
            filename,
            original_name: file.original_name,
            size: file.bytes.len() as u64,
            mimetype: file.mimetype,
        })
    }

    pub async fn image_info(&self, filename: &str) -> StoreResult<ImageInfo> {
        self.store.image_info(filename).await
    }

    pub async fn delete_image(&self, filename: &str) -> StoreResult<()> {
        self.store.delete_image(filename).await
    }
}
