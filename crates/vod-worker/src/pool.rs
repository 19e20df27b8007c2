//! Lifecycle owner for the scheduler and the worker set.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vod_app::{
    CompleteTranscodeJob, FailTranscodeJob, FindNextPendingTranscodeJob, StartTranscodeJob,
};
use vod_media::Transcoder;
use vod_storage::AssetStore;

use crate::scheduler::JobScheduler;
use crate::worker::TranscodeWorker;

/// Pool sizing and timing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers; also the queue capacity.
    pub worker_limit: usize,
    /// How often the scheduler polls storage.
    pub poll_interval: Duration,
    /// How long `wait` blocks for draining before giving up.
    pub shutdown_wait: Duration,
}

/// Fixed-size worker pool fed by one polling scheduler.
///
/// On cancellation the scheduler exits first and closes the queue by
/// dropping its sender; workers finish their in-flight job, drain whatever
/// is still buffered, and exit.
pub struct WorkerPool {
    scheduler: Option<JobScheduler>,
    workers: Vec<TranscodeWorker>,
    tasks: Vec<JoinHandle<()>>,
    shutdown_wait: Duration,
}

impl WorkerPool {
    pub fn new(
        config: PoolConfig,
        find_next: Arc<FindNextPendingTranscodeJob>,
        start_job: Arc<StartTranscodeJob>,
        complete_job: Arc<CompleteTranscodeJob>,
        fail_job: Arc<FailTranscodeJob>,
        store: Arc<dyn AssetStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let worker_limit = config.worker_limit.max(1);
        let (job_tx, job_rx) = mpsc::channel(worker_limit);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let scheduler = JobScheduler::new(find_next, job_tx, config.poll_interval);

        let workers = (0..worker_limit)
            .map(|id| {
                TranscodeWorker::new(
                    id,
                    Arc::clone(&start_job),
                    Arc::clone(&complete_job),
                    Arc::clone(&fail_job),
                    Arc::clone(&store),
                    Arc::clone(&transcoder),
                    Arc::clone(&job_rx),
                )
            })
            .collect();

        Self {
            scheduler: Some(scheduler),
            workers,
            tasks: Vec::new(),
            shutdown_wait: config.shutdown_wait,
        }
    }

    /// Spawn the scheduler and all workers. Non-blocking.
    pub fn start(&mut self, shutdown: &CancellationToken) {
        if let Some(scheduler) = self.scheduler.take() {
            self.tasks.push(tokio::spawn(scheduler.run(shutdown.clone())));
        }

        for worker in self.workers.drain(..) {
            self.tasks.push(tokio::spawn(worker.run(shutdown.clone())));
        }

        info!(workers = self.tasks.len().saturating_sub(1), "worker pool started");
    }

    /// Block until the scheduler and every worker have exited, bounded by
    /// the configured shutdown wait. Returns whether draining completed.
    pub async fn wait(self) -> bool {
        let drain = futures::future::join_all(self.tasks);

        match tokio::time::timeout(self.shutdown_wait, drain).await {
            Ok(_) => {
                info!("worker pool drained");
                true
            }
            Err(_) => {
                warn!(
                    wait = ?self.shutdown_wait,
                    "worker pool did not drain in time, abandoning remaining tasks"
                );
                false
            }
        }
    }
}
