//! Claim a job for execution: `job → running`, `video → processing`, in one
//! transaction.

use std::sync::Arc;

use vod_models::{Job, ResourceId};
use vod_repo::Database;

use crate::error::AppError;

/// Where the worker finds the source asset for a claimed job.
#[derive(Debug, Clone)]
pub struct TranscodeSource {
    pub resource_id: ResourceId,
    pub source_filename: String,
}

pub struct StartTranscodeJob {
    db: Arc<dyn Database>,
}

impl StartTranscodeJob {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Move the job to `running` and its video to `processing`, atomically.
    /// An illegal job transition fails before any transaction is opened.
    pub async fn execute(&self, job: &mut Job) -> Result<TranscodeSource, AppError> {
        job.start()?;

        let mut uow = self.db.begin().await?;

        let mut video = uow.find_video(&job.video_id).await?;
        video.mark_as_processing()?;

        uow.save_job(job).await?;
        uow.save_video(&video).await?;
        uow.commit().await?;

        Ok(TranscodeSource {
            resource_id: video.resource_id,
            source_filename: video.filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vod_models::{JobError, JobId, JobStatus, JobType, Video, VideoError, VideoId, VideoStatus};
    use vod_repo::MemoryDb;

    fn seed(db: &MemoryDb) -> Job {
        let video = Video::new(
            VideoId::from_string("v1"),
            "t",
            "d",
            "a.mp4",
            ResourceId::from_string("r1"),
        )
        .unwrap();
        let job = Job::new(
            JobId::from_string("j1"),
            video.id.clone(),
            JobType::Transcode,
        )
        .unwrap();
        db.insert_video(video);
        db.insert_job(job.clone());
        job
    }

    #[tokio::test]
    async fn start_persists_both_transitions() {
        let db = MemoryDb::new();
        let mut job = seed(&db);
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        let source = uc.execute(&mut job).await.unwrap();

        assert_eq!(source.resource_id.as_str(), "r1");
        assert_eq!(source.source_filename, "a.mp4");
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Running);
        assert_eq!(db.video("v1").unwrap().status, VideoStatus::Processing);
    }

    #[tokio::test]
    async fn start_rejects_a_running_job_without_opening_a_transaction() {
        let db = MemoryDb::new();
        let mut job = seed(&db);
        job.start().unwrap();
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        let err = uc.execute(&mut job).await.unwrap_err();

        assert!(matches!(err, AppError::Job(JobError::CannotBeStarted)));
        assert_eq!(db.begin_count(), 0);
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn start_fails_when_the_video_is_missing_and_persists_nothing() {
        let db = MemoryDb::new();
        let mut job = Job::new(
            JobId::from_string("j1"),
            VideoId::from_string("ghost"),
            JobType::Transcode,
        )
        .unwrap();
        db.insert_job(job.clone());
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        let err = uc.execute(&mut job).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn start_fails_when_the_video_cannot_be_processed() {
        let db = MemoryDb::new();
        let mut job = seed(&db);
        let mut video = db.video("v1").unwrap();
        video.status = VideoStatus::Published;
        db.insert_video(video);
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        let err = uc.execute(&mut job).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Video(VideoError::CannotBeMarkedAsProcessing)
        ));
        // Rolled back: the stored job is untouched.
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn commit_failure_persists_neither_transition() {
        let db = MemoryDb::new();
        let mut job = seed(&db);
        db.fail_next_commit();
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        let err = uc.execute(&mut job).await.unwrap_err();

        assert!(matches!(err, AppError::Repo(_)));
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Pending);
        assert_eq!(db.video("v1").unwrap().status, VideoStatus::Pending);
    }

    #[tokio::test]
    async fn a_failed_job_can_be_restarted() {
        let db = MemoryDb::new();
        let mut job = seed(&db);
        let uc = StartTranscodeJob::new(Arc::new(db.clone()));

        // First run fails.
        uc.execute(&mut job).await.unwrap();
        job.mark_as_failed("bad codec").unwrap();
        let mut video = db.video("v1").unwrap();
        video.mark_as_failed().unwrap();
        db.insert_video(video);
        db.insert_job(job.clone());

        // Re-dispatch brings it back to running.
        uc.execute(&mut job).await.unwrap();
        assert_eq!(db.job("j1").unwrap().status, JobStatus::Running);
        assert_eq!(db.video("v1").unwrap().status, VideoStatus::Processing);
    }
}
