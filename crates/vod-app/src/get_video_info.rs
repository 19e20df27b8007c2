//! Read a video together with its most recent job.

use std::sync::Arc;

use vod_models::{Video, VideoId};
use vod_repo::Database;

use crate::error::AppError;

/// A video plus the outcome of its latest job.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub video: Video,
    /// Promoted manifest location, empty until a transcode completed.
    pub manifest_path: String,
    /// Last job error, empty unless the job failed.
    pub error_msg: String,
}

pub struct GetVideoInfo {
    db: Arc<dyn Database>,
}

impl GetVideoInfo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn execute(&self, id: &VideoId) -> Result<VideoInfo, AppError> {
        let mut uow = self.db.begin().await?;

        let video = uow.find_video(id).await?;
        let job = uow.find_job_by_video_id(id).await?;
        uow.rollback().await?;

        Ok(VideoInfo {
            video,
            manifest_path: job.result,
            error_msg: job.error_msg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vod_models::{Job, JobId, JobType, ResourceId};
    use vod_repo::MemoryDb;

    #[tokio::test]
    async fn returns_video_with_its_latest_job_outcome() {
        let db = MemoryDb::new();
        let video = Video::new(
            VideoId::from_string("v1"),
            "t",
            "d",
            "a.mp4",
            ResourceId::from_string("r1"),
        )
        .unwrap();
        let mut job = Job::new(
            JobId::from_string("j1"),
            video.id.clone(),
            JobType::Transcode,
        )
        .unwrap();
        job.start().unwrap();
        job.complete("r1/manifest.mpd").unwrap();
        db.insert_video(video.clone());
        db.insert_job(job);

        let uc = GetVideoInfo::new(Arc::new(db));
        let info = uc.execute(&video.id).await.unwrap();

        assert_eq!(info.video.id, video.id);
        assert_eq!(info.manifest_path, "r1/manifest.mpd");
        assert!(info.error_msg.is_empty());
    }

    #[tokio::test]
    async fn missing_video_surfaces_as_not_found() {
        let db = MemoryDb::new();
        let uc = GetVideoInfo::new(Arc::new(db));

        let err = uc
            .execute(&VideoId::from_string("ghost"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
