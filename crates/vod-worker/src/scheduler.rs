//! Periodic poll for dispatchable jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vod_app::FindNextPendingTranscodeJob;
use vod_models::Job;

/// Wait applied after a repository error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polls storage for the oldest pending transcode job and pushes it into
/// the worker queue.
///
/// The enqueue is non-blocking: when the queue is full the job is simply
/// left `pending` in storage and rediscovered on a later tick. Storage is
/// the source of truth, so a dropped tick loses nothing.
pub struct JobScheduler {
    find_next: Arc<FindNextPendingTranscodeJob>,
    job_tx: mpsc::Sender<Job>,
    poll_interval: Duration,
}

impl JobScheduler {
    pub fn new(
        find_next: Arc<FindNextPendingTranscodeJob>,
        job_tx: mpsc::Sender<Job>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            find_next,
            job_tx,
            poll_interval,
        }
    }

    /// Run until cancelled. Dropping `self` on exit closes the job queue,
    /// which lets the workers drain and stop.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("job scheduler started");

        let mut ticker = tokio::time::interval(self.poll_interval);
        // The first tick of a tokio interval fires immediately; consume it
        // so polls are spaced one full interval apart.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("job scheduler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll().await;
                }
            }
        }
    }

    async fn poll(&self) {
        let job = match self.find_next.execute().await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "find next pending transcode job");
                tokio::time::sleep(ERROR_BACKOFF).await;
                return;
            }
        };

        match self.job_tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                warn!(
                    job_id = %job.id,
                    "job queue full, leaving job pending for a later tick"
                );
            }
            Err(TrySendError::Closed(job)) => {
                // Workers already gone; shutdown is imminent.
                warn!(job_id = %job.id, "job queue closed, dropping dispatch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vod_models::{JobId, JobType, VideoId};
    use vod_repo::{Database, MemoryDb, RepoError, UnitOfWork};

    fn pending_job(id: &str) -> Job {
        Job::new(
            JobId::from_string(id),
            VideoId::from_string("v1"),
            JobType::Transcode,
        )
        .unwrap()
    }

    fn scheduler_over(db: MemoryDb, capacity: usize) -> (JobScheduler, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        let find_next = Arc::new(FindNextPendingTranscodeJob::new(Arc::new(db)));
        (
            JobScheduler::new(find_next, tx, Duration::from_millis(10)),
            rx,
        )
    }

    #[tokio::test]
    async fn an_empty_queue_is_quiet() {
        let (scheduler, mut rx) = scheduler_over(MemoryDb::new(), 1);

        scheduler.poll().await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn a_pending_job_is_enqueued() {
        let db = MemoryDb::new();
        db.insert_job(pending_job("j1"));
        let (scheduler, mut rx) = scheduler_over(db, 1);

        scheduler.poll().await;

        assert_eq!(rx.try_recv().unwrap().id.as_str(), "j1");
    }

    #[tokio::test]
    async fn a_full_queue_drops_the_tick_and_a_later_tick_recovers() {
        let db = MemoryDb::new();
        db.insert_job(pending_job("j1"));
        let (scheduler, mut rx) = scheduler_over(db.clone(), 1);

        // Queue already holds an undelivered job.
        scheduler.job_tx.try_send(pending_job("busy")).unwrap();

        scheduler.poll().await;

        // The enqueue was dropped; the job is still pending in storage.
        assert_eq!(rx.try_recv().unwrap().id.as_str(), "busy");
        assert!(rx.try_recv().is_err());
        assert_eq!(db.job("j1").unwrap().status, vod_models::JobStatus::Pending);

        // With a slot free again, the same job is rediscovered.
        scheduler.poll().await;
        assert_eq!(rx.try_recv().unwrap().id.as_str(), "j1");
    }

    struct BrokenDb;

    #[async_trait]
    impl Database for BrokenDb {
        async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
            Err(RepoError::Internal("connection refused".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn repository_errors_back_off_and_do_not_propagate() {
        let (tx, mut rx) = mpsc::channel(1);
        let find_next = Arc::new(FindNextPendingTranscodeJob::new(Arc::new(BrokenDb)));
        let scheduler = JobScheduler::new(find_next, tx, Duration::from_millis(10));

        let before = tokio::time::Instant::now();
        scheduler.poll().await;

        assert!(before.elapsed() >= ERROR_BACKOFF);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancellation_stops_the_scheduler_and_closes_the_queue() {
        let (scheduler, mut rx) = scheduler_over(MemoryDb::new(), 1);
        let token = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(token.clone()));
        token.cancel();
        handle.await.unwrap();

        // Sender dropped with the scheduler: the queue reads as closed.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
