//! Per-job orchestration: Start → Transcode → Promote → Complete/Fail.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vod_app::{CompleteTranscodeJob, FailTranscodeJob, StartTranscodeJob};
use vod_media::Transcoder;
use vod_models::Job;
use vod_storage::AssetStore;

/// One queue consumer.
///
/// A job that has been accepted always runs to a terminal state before the
/// worker looks at the cancellation token again; workers are never
/// preempted mid-job. Scratch output is owned by the transcode result and
/// disappears when it goes out of scope, on every exit path.
pub struct TranscodeWorker {
    id: usize,
    start_job: Arc<StartTranscodeJob>,
    complete_job: Arc<CompleteTranscodeJob>,
    fail_job: Arc<FailTranscodeJob>,
    store: Arc<dyn AssetStore>,
    transcoder: Arc<dyn Transcoder>,
    job_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl TranscodeWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        start_job: Arc<StartTranscodeJob>,
        complete_job: Arc<CompleteTranscodeJob>,
        fail_job: Arc<FailTranscodeJob>,
        store: Arc<dyn AssetStore>,
        transcoder: Arc<dyn Transcoder>,
        job_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    ) -> Self {
        Self {
            id,
            start_job,
            complete_job,
            fail_job,
            store,
            transcoder,
            job_rx,
        }
    }

    /// Consume jobs until cancelled or the queue closes.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(worker = self.id, "worker shutting down");
                    return;
                }
                job = next_job(&self.job_rx) => match job {
                    Some(job) => job,
                    None => {
                        info!(worker = self.id, "job queue closed, worker exiting");
                        return;
                    }
                },
            };

            self.process(job).await;
        }
    }

    async fn process(&self, mut job: Job) {
        let source = match self.start_job.execute(&mut job).await {
            Ok(source) => source,
            Err(e) => {
                // Transaction rolled back; the job stays pending in storage.
                error!(worker = self.id, job_id = %job.id, error = %e, "start job");
                return;
            }
        };

        let output = match self
            .transcoder
            .transcode(&source.resource_id, &source.source_filename)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                error!(worker = self.id, job_id = %job.id, error = %e, "transcode job");
                self.fail(&mut job, &e.to_string()).await;
                return;
            }
        };

        // Promote every produced file into durable storage.
        let scratch_dir = output
            .manifest_path
            .parent()
            .unwrap_or_else(|| output.scratch_path());

        for rel_path in &output.output_files {
            let temp_path = scratch_dir.join(rel_path);

            let mut temp_file = match tokio::fs::File::open(&temp_path).await {
                Ok(file) => file,
                Err(e) => {
                    error!(
                        worker = self.id,
                        job_id = %job.id,
                        path = %temp_path.display(),
                        error = %e,
                        "open transcoded output for promotion"
                    );
                    self.fail(&mut job, "failed to read transcoded output").await;
                    return;
                }
            };

            if let Err(e) = self
                .store
                .save(&source.resource_id, rel_path, &mut temp_file)
                .await
            {
                error!(
                    worker = self.id,
                    job_id = %job.id,
                    path = rel_path.as_str(),
                    error = %e,
                    "save transcoded output"
                );
                self.fail(&mut job, "failed to save transcoded output").await;
                return;
            }
        }

        let manifest_location = promoted_manifest_location(
            source.resource_id.as_str(),
            &output.manifest_path,
        );

        if let Err(e) = self
            .complete_job
            .execute(&mut job, &manifest_location, output.duration)
            .await
        {
            // Files are already promoted; storage remains the source of
            // truth and the job will be observable as still running.
            error!(worker = self.id, job_id = %job.id, error = %e, "complete job");
            return;
        }

        info!(
            worker = self.id,
            job_id = %job.id,
            manifest = manifest_location.as_str(),
            "job completed"
        );
    }

    async fn fail(&self, job: &mut Job, error_msg: &str) {
        if let Err(e) = self.fail_job.execute(job, error_msg).await {
            error!(worker = self.id, job_id = %job.id, error = %e, "record job failure");
        }
    }
}

async fn next_job(queue: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    queue.lock().await.recv().await
}

/// Durable location of the manifest after promotion, relative to the asset
/// store root.
fn promoted_manifest_location(resource_id: &str, manifest_path: &Path) -> String {
    let manifest_file = manifest_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest.mpd".to_string());
    format!("{resource_id}/{manifest_file}")
}
