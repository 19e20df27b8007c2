//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::videos::{get_video_info, upload_video};
use crate::handlers::health;
use crate::state::AppState;

/// Request body cap for uploads: 1 GiB.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let video_routes = Router::new()
        .route("/video/", post(upload_video))
        .route("/video/:id", get(get_video_info));

    Router::new()
        .nest("/api", video_routes)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
