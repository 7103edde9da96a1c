//! Typed errors surfaced by the storage and domain layers.

use shared::{PatchError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Carries the record kind, e.g. "Cattle record".
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("No fields to update")]
    NoOp,
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<PatchError> for StoreError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::NoOp => StoreError::NoOp,
            PatchError::Validation(e) => StoreError::Validation(e),
        }
    }
}

impl StoreError {
    /// Caller errors, as opposed to backend failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::Validation(_) | StoreError::NotFound(_) | StoreError::NoOp
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
