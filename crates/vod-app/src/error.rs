//! Use-case error type.

use thiserror::Error;

use vod_models::{JobError, VideoError};
use vod_repo::RepoError;
use vod_storage::StorageError;

/// Errors surfaced by the use cases.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("repository: {0}")]
    Repo(#[from] RepoError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    /// True when the underlying failure is the repository's distinguished
    /// not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Repo(RepoError::NotFound))
    }
}
