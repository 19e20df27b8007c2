//! Video API handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;

use vod_app::UploadVideoInput;
use vod_models::VideoId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a successful upload.
#[derive(Serialize)]
pub struct UploadVideoResponse {
    pub video_id: String,
    pub job_id: String,
    pub status: String,
    pub resource_id: String,
}

/// Video info response.
#[derive(Serialize)]
pub struct VideoInfoResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub source_filename: String,
    pub status: String,
    pub duration_seconds: f64,
    /// Present once a transcode completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    /// Present when the latest job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /api/video/`, a multipart upload.
///
/// Text parts (`title`, `description`) must precede the `video` file part:
/// the file is streamed straight into the asset store, so parts after it
/// are never read.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadVideoResponse>)> {
    let mut title = String::new();
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid title field: {e}")))?;
            }
            "description" => {
                description = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("invalid description field: {e}"))
                })?;
            }
            "video" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ApiError::bad_request("missing video filename"))?;

                let stream = field
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
                let reader = StreamReader::new(stream);
                futures::pin_mut!(reader);

                let output = state
                    .upload_video
                    .execute(UploadVideoInput {
                        title,
                        description,
                        file_name,
                        content: reader,
                    })
                    .await?;

                let response = UploadVideoResponse {
                    video_id: output.video.id.to_string(),
                    job_id: output.job.id.to_string(),
                    status: output.video.status.to_string(),
                    resource_id: output.video.resource_id.to_string(),
                };
                return Ok((StatusCode::CREATED, Json(response)));
            }
            _ => {}
        }
    }

    Err(ApiError::bad_request("missing video file"))
}

/// `GET /api/video/:id`
pub async fn get_video_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoInfoResponse>> {
    let info = state
        .get_video_info
        .execute(&VideoId::from_string(id))
        .await?;

    let response = VideoInfoResponse {
        id: info.video.id.to_string(),
        title: info.video.title,
        description: info.video.description,
        source_filename: info.video.filename,
        status: info.video.status.to_string(),
        duration_seconds: info.video.duration.as_secs_f64(),
        manifest_path: Some(info.manifest_path).filter(|p| !p.is_empty()),
        error_message: Some(info.error_msg).filter(|m| !m.is_empty()),
        created_at: info.video.created_at,
        updated_at: info.video.updated_at,
    };

    Ok(Json(response))
}
