//! Job entity: a persistent unit of background work for a video.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::video::VideoId;

/// Errors produced by [`Job`] validation and transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job id cannot be empty")]
    IdEmpty,

    #[error("job video id cannot be empty")]
    VideoIdEmpty,

    #[error("job type is invalid: {0}")]
    TypeInvalid(String),

    #[error("job cannot be started")]
    CannotBeStarted,

    #[error("job cannot be completed")]
    CannotBeCompleted,

    #[error("job cannot be marked as failed")]
    CannotBeMarkedAsFailed,

    #[error("unknown job status: {0}")]
    StatusInvalid(String),
}

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
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

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of work a job performs.
///
/// Only transcoding exists today; thumbnail generation is a likely next
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Transcode,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Transcode => "transcode",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcode" => Ok(JobType::Transcode),
            other => Err(JobError::TypeInvalid(other.to_string())),
        }
    }
}

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be dispatched
    Pending,
    /// Claimed by a worker
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(JobError::StatusInvalid(other.to_string())),
        }
    }
}

/// A persistent record of work to perform on a video.
///
/// Legal transitions: `pending | failed → running`, then
/// `running → completed` or `running → failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub video_id: VideoId,
    pub job_type: JobType,
    pub status: JobStatus,
    /// Populated on completion; the promoted manifest location.
    pub result: String,
    /// Populated on failure.
    pub error_msg: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in `pending` state.
    pub fn new(id: JobId, video_id: VideoId, job_type: JobType) -> Result<Self, JobError> {
        if id.as_str().is_empty() {
            return Err(JobError::IdEmpty);
        }
        if video_id.as_str().is_empty() {
            return Err(JobError::VideoIdEmpty);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            video_id,
            job_type,
            status: JobStatus::Pending,
            result: String::new(),
            error_msg: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Transition to `running`. Allowed from `pending` and `failed`.
    pub fn start(&mut self) -> Result<(), JobError> {
        if !self.can_be_started() {
            return Err(JobError::CannotBeStarted);
        }

        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `completed`, recording the result. Allowed from
    /// `running`.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<(), JobError> {
        if !self.is_running() {
            return Err(JobError::CannotBeCompleted);
        }

        self.status = JobStatus::Completed;
        self.result = result.into();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `failed`, recording the error message. Allowed from
    /// `running`.
    pub fn mark_as_failed(&mut self, error_msg: impl Into<String>) -> Result<(), JobError> {
        if !self.is_running() {
            return Err(JobError::CannotBeMarkedAsFailed);
        }

        self.status = JobStatus::Failed;
        self.error_msg = error_msg.into();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    pub fn can_be_started(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Failed)
    }
}
