//! In-memory backend for tests.
//!
//! Writes are staged inside the unit of work and applied to the shared
//! store in one locked step on commit, so the commit-or-nothing behavior of
//! the Postgres backend can be exercised without a database. Reads observe
//! staged writes first (read-your-writes inside one transaction).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vod_models::{Job, JobStatus, JobType, Video, VideoId};

use crate::error::RepoError;
use crate::{Database, UnitOfWork};

#[derive(Default)]
struct MemoryStore {
    videos: HashMap<String, Video>,
    jobs: HashMap<String, Job>,
}

/// In-memory [`Database`].
#[derive(Clone, Default)]
pub struct MemoryDb {
    store: Arc<Mutex<MemoryStore>>,
    fail_next_commit: Arc<AtomicBool>,
    begins: Arc<AtomicUsize>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail, for atomicity tests.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// How many units of work have been opened.
    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Committed view of a video.
    pub fn video(&self, id: &str) -> Option<Video> {
        self.store.lock().expect("store poisoned").videos.get(id).cloned()
    }

    /// Committed view of a job.
    pub fn job(&self, id: &str) -> Option<Job> {
        self.store.lock().expect("store poisoned").jobs.get(id).cloned()
    }

    /// Seed a video directly, bypassing any transaction.
    pub fn insert_video(&self, video: Video) {
        self.store
            .lock()
            .expect("store poisoned")
            .videos
            .insert(video.id.as_str().to_string(), video);
    }

    /// Seed a job directly, bypassing any transaction.
    pub fn insert_job(&self, job: Job) {
        self.store
            .lock()
            .expect("store poisoned")
            .jobs
            .insert(job.id.as_str().to_string(), job);
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryUnitOfWork {
            store: Arc::clone(&self.store),
            fail_commit: Arc::clone(&self.fail_next_commit),
            staged_videos: HashMap::new(),
            staged_jobs: HashMap::new(),
        }))
    }
}

/// In-memory [`UnitOfWork`]. Dropped without commit, the staged writes are
/// simply discarded.
pub struct MemoryUnitOfWork {
    store: Arc<Mutex<MemoryStore>>,
    fail_commit: Arc<AtomicBool>,
    staged_videos: HashMap<String, Video>,
    staged_jobs: HashMap<String, Job>,
}

impl MemoryUnitOfWork {
    fn merged_jobs(&self, store: &MemoryStore) -> Vec<Job> {
        let mut merged: HashMap<&str, &Job> =
            store.jobs.iter().map(|(k, v)| (k.as_str(), v)).collect();
        for (k, v) in &self.staged_jobs {
            merged.insert(k.as_str(), v);
        }
        merged.into_values().cloned().collect()
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn save_video(&mut self, video: &Video) -> Result<(), RepoError> {
        self.staged_videos
            .insert(video.id.as_str().to_string(), video.clone());
        Ok(())
    }

    async fn find_video(&mut self, id: &VideoId) -> Result<Video, RepoError> {
        if let Some(video) = self.staged_videos.get(id.as_str()) {
            return Ok(video.clone());
        }

        let store = self.store.lock().expect("store poisoned");
        store
            .videos
            .get(id.as_str())
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn save_job(&mut self, job: &Job) -> Result<(), RepoError> {
        self.staged_jobs
            .insert(job.id.as_str().to_string(), job.clone());
        Ok(())
    }

    async fn find_job_by_video_id(&mut self, video_id: &VideoId) -> Result<Job, RepoError> {
        let store = self.store.lock().expect("store poisoned");
        self.merged_jobs(&store)
            .into_iter()
            .filter(|j| j.video_id == *video_id)
            .max_by_key(|j| j.created_at)
            .ok_or(RepoError::NotFound)
    }

    async fn find_next_pending_transcode_job(&mut self) -> Result<Option<Job>, RepoError> {
        let store = self.store.lock().expect("store poisoned");
        Ok(self
            .merged_jobs(&store)
            .into_iter()
            .filter(|j| j.status == JobStatus::Pending && j.job_type == JobType::Transcode)
            .min_by_key(|j| j.created_at))
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Internal("injected commit failure".into()));
        }

        let mut store = self.store.lock().expect("store poisoned");
        store.videos.extend(self.staged_videos);
        store.jobs.extend(self.staged_jobs);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        Ok(())
    }
}
