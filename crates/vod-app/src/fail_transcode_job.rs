//! Record a failed job: `job → failed` with its error message,
//! `video → failed`, in one transaction.

use std::sync::Arc;

use vod_models::Job;
use vod_repo::Database;

use crate::error::AppError;

pub struct FailTranscodeJob {
    db: Arc<dyn Database>,
}

impl FailTranscodeJob {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Mark the job and its video as failed, atomically. An illegal job
    /// transition fails before any transaction is opened.
    pub async fn execute(&self, job: &mut Job, error_msg: &str) -> Result<(), AppError> {
        job.mark_as_failed(error_msg)?;

        let mut uow = self.db.begin().await?;

        let mut video = uow.find_video(&job.video_id).await?;
        video.mark_as_failed()?;

        uow.save_job(job).await?;
        uow.save_video(&video).await?;
        uow.commit().await?;

        Ok(())
    }
}
