//! HTTP handlers.

pub mod videos;

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
