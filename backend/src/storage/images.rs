use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::validation::validate_filename;
use shared::ImageInfo;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::storage::traits::ImageStorage;

/// Images kept as flat files under one managed directory
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if missing
    pub async fn ensure_dir(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, filename: &str) -> StoreResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

fn not_found(err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound("Image")
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl ImageStorage for LocalImageStore {
    async fn save_image(&self, filename: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path_for(filename)?;
        self.ensure_dir().await?;
        tokio::fs::write(&path, bytes).await?;
        info!("Stored image {} ({} bytes)", filename, bytes.len());
        Ok(())
    }

    async fn image_info(&self, filename: &str) -> StoreResult<ImageInfo> {
        let path = self.path_for(filename)?;
        let metadata = tokio::fs::metadata(&path).await.map_err(not_found)?;
        Ok(ImageInfo {
            filename: filename.to_string(),
            size: metadata.len(),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn delete_image(&self, filename: &str) -> StoreResult<()> {
        let path = self.path_for(filename)?;
        tokio::fs::remove_file(&path).await.map_err(not_found)?;
        info!("Deleted image {}", filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ValidationError;

    #[tokio::test]
    async fn test_save_info_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("uploads"));

        store.save_image("a.png", b"\x89PNG").await.expect("Failed to save");
        let info = store.image_info("a.png").await.unwrap();
        assert_eq!(info.size, 4);
        assert!(info.modified.is_some());

        store.delete_image("a.png").await.unwrap();
        assert!(matches!(store.image_info("a.png").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete_image("a.png").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());

        for name in ["../secret", "a/b.png", "a\\b.png", ""] {
            assert!(matches!(
                store.delete_image(name).await,
                Err(StoreError::Validation(ValidationError::InvalidFilename))
            ));
        }
    }
}
