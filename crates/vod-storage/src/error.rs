//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing assets.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write asset {path}: {source}")]
    WriteAsset {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("delete resource {resource_id}: {source}")]
    DeleteResource {
        resource_id: String,
        source: std::io::Error,
    },
}
