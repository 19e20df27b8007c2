//! Application state.

use std::sync::Arc;

use vod_app::{GetVideoInfo, UploadVideo};

/// Shared handler state: the HTTP-facing use cases.
#[derive(Clone)]
pub struct AppState {
    pub upload_video: Arc<UploadVideo>,
    pub get_video_info: Arc<GetVideoInfo>,
}
