//! Accept an uploaded video: store the original bytes and register the
//! video with its transcode job in one transaction.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::error;

use vod_models::{Job, JobId, JobType, ResourceId, Video, VideoId};
use vod_repo::Database;
use vod_storage::AssetStore;

use crate::error::AppError;

/// Input for [`UploadVideo`]. `content` is consumed lazily; bytes are
/// streamed straight into the asset store.
pub struct UploadVideoInput<R> {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub content: R,
}

#[derive(Debug)]
pub struct UploadVideoOutput {
    pub video: Video,
    pub job: Job,
}

pub struct UploadVideo {
    store: Arc<dyn AssetStore>,
    db: Arc<dyn Database>,
}

impl UploadVideo {
    pub fn new(store: Arc<dyn AssetStore>, db: Arc<dyn Database>) -> Self {
        Self { store, db }
    }

    /// Store the original asset, then create `Video(pending)` and
    /// `Job(pending, transcode)` atomically.
    ///
    /// If anything fails after the asset bytes were written, the resource
    /// subtree is deleted before the error is returned.
    pub async fn execute<R>(&self, input: UploadVideoInput<R>) -> Result<UploadVideoOutput, AppError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let UploadVideoInput {
            title,
            description,
            file_name,
            mut content,
        } = input;

        let resource_id = ResourceId::new();
        self.store
            .save(&resource_id, &file_name, &mut content)
            .await?;

        match self
            .persist(&title, &description, &file_name, &resource_id)
            .await
        {
            Ok(output) => Ok(output),
            Err(err) => {
                if let Err(cleanup_err) = self.store.delete_all(&resource_id).await {
                    error!(
                        resource_id = %resource_id,
                        error = %cleanup_err,
                        "failed to clean up stored asset after upload error"
                    );
                }
                Err(err)
            }
        }
    }

    async fn persist(
        &self,
        title: &str,
        description: &str,
        file_name: &str,
        resource_id: &ResourceId,
    ) -> Result<UploadVideoOutput, AppError> {
        let video = Video::new(
            VideoId::new(),
            title,
            description,
            file_name,
            resource_id.clone(),
        )?;
        let job = Job::new(JobId::new(), video.id.clone(), JobType::Transcode)?;

        let mut uow = self.db.begin().await?;
        uow.save_video(&video).await?;
        uow.save_job(&job).await?;
        uow.commit().await?;

        Ok(UploadVideoOutput { video, job })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingStore;
    use vod_models::{JobStatus, VideoStatus};
    use vod_repo::MemoryDb;

    fn input(content: &'static [u8]) -> UploadVideoInput<&'static [u8]> {
        UploadVideoInput {
            title: "T".to_string(),
            description: "D".to_string(),
            file_name: "a.mp4".to_string(),
            content,
        }
    }

    #[tokio::test]
    async fn upload_stores_asset_and_creates_both_entities() {
        let db = MemoryDb::new();
        let store = Arc::new(RecordingStore::default());
        let uc = UploadVideo::new(store.clone(), Arc::new(db.clone()));

        let out = uc.execute(input(b"bytes")).await.unwrap();

        assert_eq!(out.video.status, VideoStatus::Pending);
        assert_eq!(out.video.title, "T");
        assert_eq!(out.video.filename, "a.mp4");
        assert_eq!(out.job.status, JobStatus::Pending);
        assert_eq!(out.job.video_id, out.video.id);

        // Persisted atomically
        assert!(db.video(out.video.id.as_str()).is_some());
        assert!(db.job(out.job.id.as_str()).is_some());

        // Asset saved under the fresh resource id
        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, out.video.resource_id.as_str());
        assert_eq!(saved[0].1, "a.mp4");
        assert_eq!(store.delete_count(), 0);
    }

    #[tokio::test]
    async fn upload_rejects_empty_filename_and_cleans_up() {
        let db = MemoryDb::new();
        let store = Arc::new(RecordingStore::default());
        let uc = UploadVideo::new(store.clone(), Arc::new(db.clone()));

        let mut bad = input(b"bytes");
        bad.file_name = String::new();
        let err = uc.execute(bad).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Video(vod_models::VideoError::FilenameEmpty)
        ));
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn commit_failure_persists_nothing_and_cleans_up_once() {
        let db = MemoryDb::new();
        db.fail_next_commit();
        let store = Arc::new(RecordingStore::default());
        let uc = UploadVideo::new(store.clone(), Arc::new(db.clone()));

        let err = uc.execute(input(b"bytes")).await.unwrap_err();
        assert!(matches!(err, AppError::Repo(_)));

        let (resource_id, _) = store.saved()[0].clone();
        assert_eq!(store.delete_count(), 1);
        assert_eq!(store.deleted(), vec![resource_id]);
    }

    #[tokio::test]
    async fn failed_asset_write_surfaces_without_creating_entities() {
        let db = MemoryDb::new();
        let store = Arc::new(RecordingStore::default());
        store.fail_saves_after(0);
        let uc = UploadVideo::new(store.clone(), Arc::new(db.clone()));

        let err = uc.execute(input(b"bytes")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        // Nothing was staged, nothing to clean up beyond the failed write.
        assert_eq!(store.delete_count(), 0);
    }
}
