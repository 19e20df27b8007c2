//! Service binary: HTTP server plus transcode worker pool in one process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_api::{create_router, AppConfig, AppState};
use vod_app::{
    CompleteTranscodeJob, FailTranscodeJob, FindNextPendingTranscodeJob, GetVideoInfo,
    StartTranscodeJob, UploadVideo,
};
use vod_media::{FfmpegTranscoder, Transcoder};
use vod_repo::{Database, PgDatabase};
use vod_storage::{AssetStore, LocalAssetStore};
use vod_worker::{PoolConfig, WorkerPool};

/// Grace period for in-flight HTTP requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("starting vod-api");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let db = match PgDatabase::connect(&config.db_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };
    if let Err(e) = db.migrate().await {
        error!(error = %e, "failed to run migrations");
        std::process::exit(1);
    }

    let store = match LocalAssetStore::new(&config.storage_path).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to initialize asset storage");
            std::process::exit(1);
        }
    };

    let database: Arc<dyn Database> = Arc::new(db);
    let store: Arc<dyn AssetStore> = Arc::new(store);
    let transcoder: Arc<dyn Transcoder> =
        Arc::new(FfmpegTranscoder::new(&config.storage_path));

    // Use cases
    let upload_video = Arc::new(UploadVideo::new(
        Arc::clone(&store),
        Arc::clone(&database),
    ));
    let get_video_info = Arc::new(GetVideoInfo::new(Arc::clone(&database)));
    let find_next = Arc::new(FindNextPendingTranscodeJob::new(Arc::clone(&database)));
    let start_job = Arc::new(StartTranscodeJob::new(Arc::clone(&database)));
    let complete_job = Arc::new(CompleteTranscodeJob::new(Arc::clone(&database)));
    let fail_job = Arc::new(FailTranscodeJob::new(Arc::clone(&database)));

    // Worker pool
    let mut pool = WorkerPool::new(
        PoolConfig {
            worker_limit: config.worker_limit,
            poll_interval: config.poll_interval,
            shutdown_wait: config.worker_wait,
        },
        find_next,
        start_job,
        complete_job,
        fail_job,
        store,
        transcoder,
    );

    let shutdown = CancellationToken::new();
    pool.start(&shutdown);

    // HTTP server
    let state = AppState {
        upload_video,
        get_video_info,
    };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "listening");

    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let http = async {
        let graceful = shutdown.clone().cancelled_owned();
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await
        {
            error!(error = %e, "http server error");
        }
    };

    // Serve until the server drains after a signal, or cut it off once the
    // shutdown grace elapses.
    tokio::select! {
        _ = http => {}
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!("shutdown grace elapsed, abandoning in-flight requests");
        }
    }

    // A server error can land here without a signal; make sure the pool
    // stops either way.
    shutdown.cancel();

    if pool.wait().await {
        info!("shutdown complete");
    } else {
        error!("worker pool did not drain, forcing exit");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    }
}

/// Cancel the root token on SIGINT or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("received shutdown signal");
    shutdown.cancel();
}
