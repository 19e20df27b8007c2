//! Repository error types.

use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The requested row does not exist. Callers distinguish this from
    /// every other failure, so it is never wrapped.
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored row that cannot be mapped back onto the domain (unknown
    /// status string, negative duration, ...).
    #[error("corrupt row: {0}")]
    Decode(String),

    #[error("{0}")]
    Internal(String),
}

impl RepoError {
    /// True when the error is the distinguished not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound)
    }
}
