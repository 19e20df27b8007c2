//! Service configuration.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DB_URL must be set")]
    MissingDbUrl,
}

/// Environment-driven configuration.
///
/// Numeric options fall back to their defaults when unset or unparseable;
/// only the database URL is required.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string
    pub db_url: String,
    /// Port the HTTP server listens on
    pub server_port: u16,
    /// Base directory of the asset store
    pub storage_path: String,
    /// Number of transcode workers (and queue capacity)
    pub worker_limit: usize,
    /// Scheduler poll interval
    pub poll_interval: Duration,
    /// How long shutdown waits for the worker pool to drain
    pub worker_wait: Duration,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_url = std::env::var("DB_URL").map_err(|_| ConfigError::MissingDbUrl)?;

        Ok(Self {
            db_url,
            server_port: std::env::var("SERVER_ADD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8085),
            storage_path: std::env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./storage".to_string()),
            worker_limit: std::env::var("WORKER_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            poll_interval: Duration::from_secs(
                std::env::var("POLL_INTERVAL_SEC")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            worker_wait: Duration::from_secs(
                std::env::var("WORKER_WAIT_SEC")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}
