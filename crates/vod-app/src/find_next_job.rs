//! Read-only poll for the oldest pending transcode job.

use std::sync::Arc;

use vod_models::Job;
use vod_repo::Database;

use crate::error::AppError;

pub struct FindNextPendingTranscodeJob {
    db: Arc<dyn Database>,
}

impl FindNextPendingTranscodeJob {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// `None` means the queue is quiet; that is the scheduler's normal
    /// steady state, not an error.
    pub async fn execute(&self) -> Result<Option<Job>, AppError> {
        let mut uow = self.db.begin().await?;
        let job = uow.find_next_pending_transcode_job().await?;
        uow.rollback().await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vod_models::{JobId, JobType, VideoId};
    use vod_repo::MemoryDb;

    #[tokio::test]
    async fn returns_none_when_no_job_is_pending() {
        let db = MemoryDb::new();
        let uc = FindNextPendingTranscodeJob::new(Arc::new(db));

        assert!(uc.execute().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn returns_the_oldest_pending_transcode_job() {
        let db = MemoryDb::new();
        let mut older = Job::new(
            JobId::from_string("j1"),
            VideoId::from_string("v1"),
            JobType::Transcode,
        )
        .unwrap();
        older.created_at = older.created_at - chrono::Duration::seconds(30);
        let newer = Job::new(
            JobId::from_string("j2"),
            VideoId::from_string("v2"),
            JobType::Transcode,
        )
        .unwrap();
        db.insert_job(newer);
        db.insert_job(older.clone());

        let uc = FindNextPendingTranscodeJob::new(Arc::new(db));
        assert_eq!(uc.execute().await.unwrap(), Some(older));
    }
}
