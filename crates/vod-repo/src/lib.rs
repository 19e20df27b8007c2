//! Transactional persistence for videos and jobs.
//!
//! The domain depends on two ports:
//! - [`Database`]: hands out units of work
//! - [`UnitOfWork`]: one database transaction exposing the repository
//!   capability set for both entities
//!
//! Two backends implement the ports: [`PgDatabase`] (Postgres via sqlx) for
//! production and [`MemoryDb`] for tests.
//!
//! A unit of work is released exactly once: `commit` and `rollback` consume
//! it, and dropping an unreleased unit of work rolls back. Use cases lean on
//! that drop behavior for their failure paths.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use vod_models::{Job, Video, VideoId};

pub use error::RepoError;
pub use memory::MemoryDb;
pub use postgres::PgDatabase;

/// One database transaction, scoped to both repositories.
///
/// By-id lookups report a missing row as [`RepoError::NotFound`];
/// [`UnitOfWork::find_next_pending_transcode_job`] reports an empty queue as
/// `Ok(None)` since that is the scheduler's normal quiescent state.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Upsert a video by id. `created_at` is never overwritten.
    async fn save_video(&mut self, video: &Video) -> Result<(), RepoError>;

    /// Load a video by id.
    async fn find_video(&mut self, id: &VideoId) -> Result<Video, RepoError>;

    /// Upsert a job by id. Only status, result, error message and
    /// `updated_at` are mutable after creation.
    async fn save_job(&mut self, job: &Job) -> Result<(), RepoError>;

    /// Load the most recently created job for a video.
    async fn find_job_by_video_id(&mut self, video_id: &VideoId) -> Result<Job, RepoError>;

    /// Load the oldest pending transcode job, if any.
    async fn find_next_pending_transcode_job(&mut self) -> Result<Option<Job>, RepoError>;

    /// Finalize the transaction.
    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    /// Cancel the transaction. Dropping an unreleased unit of work has the
    /// same effect.
    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}

/// Factory for units of work.
#[async_trait]
pub trait Database: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError>;
}
