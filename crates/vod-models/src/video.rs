//! Video entity and its publication lifecycle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by [`Video`] validation and transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VideoError {
    #[error("video id cannot be empty")]
    IdEmpty,

    #[error("video filename cannot be empty")]
    FilenameEmpty,

    #[error("resource id cannot be empty")]
    ResourceIdEmpty,

    #[error("video title cannot be empty")]
    TitleEmpty,

    #[error("video description cannot be empty")]
    DescriptionEmpty,

    #[error("video cannot be marked as processing")]
    CannotBeMarkedAsProcessing,

    #[error("video cannot be marked as failed")]
    CannotBeMarkedAsFailed,

    #[error("video cannot be published")]
    CannotBePublished,

    #[error("video cannot be archived")]
    CannotBeArchived,

    #[error("video duration has already been set")]
    DurationAlreadySet,

    #[error("unknown video status: {0}")]
    StatusInvalid(String),
}

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque key naming a video's subtree in the asset store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Generate a new random resource ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Uploaded, waiting for a transcode job to pick it up
    Pending,
    /// A transcode job is running for this video
    Processing,
    /// Transcoded output is available for streaming
    Published,
    /// The last transcode attempt failed
    Failed,
    /// Retired from reads
    Archived,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Processing => "processing",
            VideoStatus::Published => "published",
            VideoStatus::Failed => "failed",
            VideoStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "processing" => Ok(VideoStatus::Processing),
            "published" => Ok(VideoStatus::Published),
            "failed" => Ok(VideoStatus::Failed),
            "archived" => Ok(VideoStatus::Archived),
            other => Err(VideoError::StatusInvalid(other.to_string())),
        }
    }
}

/// An uploaded video and its publication lifecycle.
///
/// Legal transitions:
/// `pending | failed → processing → published → archived`, with
/// `processing → failed` on error. Duration is write-once; it is cleared
/// again when a transcode attempt fails so a retry can set a fresh value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub duration: Duration,
    pub filename: String,
    pub resource_id: ResourceId,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video in `pending` state.
    pub fn new(
        id: VideoId,
        title: impl Into<String>,
        description: impl Into<String>,
        filename: impl Into<String>,
        resource_id: ResourceId,
    ) -> Result<Self, VideoError> {
        let filename = filename.into();

        if id.as_str().is_empty() {
            return Err(VideoError::IdEmpty);
        }
        if filename.is_empty() {
            return Err(VideoError::FilenameEmpty);
        }
        if resource_id.as_str().is_empty() {
            return Err(VideoError::ResourceIdEmpty);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            title: title.into(),
            description: description.into(),
            duration: Duration::ZERO,
            filename,
            resource_id,
            status: VideoStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Transition to `processing`. Allowed from `pending` and `failed`.
    pub fn mark_as_processing(&mut self) -> Result<(), VideoError> {
        if !self.can_be_processed() {
            return Err(VideoError::CannotBeMarkedAsProcessing);
        }

        self.status = VideoStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `failed`. Allowed from `processing`.
    ///
    /// Clears the duration so a retried transcode can record its own.
    pub fn mark_as_failed(&mut self) -> Result<(), VideoError> {
        if !self.is_processing() {
            return Err(VideoError::CannotBeMarkedAsFailed);
        }

        self.status = VideoStatus::Failed;
        self.duration = Duration::ZERO;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `published`. Allowed from `processing`.
    pub fn publish(&mut self) -> Result<(), VideoError> {
        if !self.is_processing() {
            return Err(VideoError::CannotBePublished);
        }

        self.status = VideoStatus::Published;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `archived`. Allowed from `published`.
    pub fn archive(&mut self) -> Result<(), VideoError> {
        if !self.is_published() {
            return Err(VideoError::CannotBeArchived);
        }

        self.status = VideoStatus::Archived;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the title. Rejects an empty string.
    pub fn update_title(&mut self, title: impl Into<String>) -> Result<(), VideoError> {
        let title = title.into();
        if title.is_empty() {
            return Err(VideoError::TitleEmpty);
        }

        self.title = title;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the description. Rejects an empty string.
    pub fn update_description(&mut self, description: impl Into<String>) -> Result<(), VideoError> {
        let description = description.into();
        if description.is_empty() {
            return Err(VideoError::DescriptionEmpty);
        }

        self.description = description;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the probed duration. Write-once: a second call with a duration
    /// already present fails.
    pub fn update_duration(&mut self, duration: Duration) -> Result<(), VideoError> {
        if self.duration != Duration::ZERO {
            return Err(VideoError::DurationAlreadySet);
        }

        self.duration = duration;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == VideoStatus::Pending
    }

    pub fn is_processing(&self) -> bool {
        self.status == VideoStatus::Processing
    }

    pub fn is_published(&self) -> bool {
        self.status == VideoStatus::Published
    }

    pub fn is_failed(&self) -> bool {
        self.status == VideoStatus::Failed
    }

    pub fn is_archived(&self) -> bool {
        self.status == VideoStatus::Archived
    }

    pub fn can_be_processed(&self) -> bool {
        matches!(self.status, VideoStatus::Pending | VideoStatus::Failed)
    }
}
