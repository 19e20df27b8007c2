//! Finish a job: `job → completed` with its result, `video → published`
//! with its duration, in one transaction.

use std::sync::Arc;
use std::time::Duration;

use vod_models::Job;
use vod_repo::Database;

use crate::error::AppError;

pub struct CompleteTranscodeJob {
    db: Arc<dyn Database>,
}

impl CompleteTranscodeJob {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Record the promoted manifest location on the job, the probed
    /// duration on the video, and publish, all atomically. An illegal job
    /// transition fails before any transaction is opened.
    pub async fn execute(
        &self,
        job: &mut Job,
        result: &str,
        duration: Duration,
    ) -> Result<(), AppError> {
        job.complete(result)?;

        let mut uow = self.db.begin().await?;

        let mut video = uow.find_video(&job.video_id).await?;
        video.update_duration(duration)?;
        video.publish()?;

        uow.save_job(job).await?;
        uow.save_video(&video).await?;
        uow.commit().await?;

        Ok(())
    }
}
