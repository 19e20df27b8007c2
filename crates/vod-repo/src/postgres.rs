//! Postgres backend.
//!
//! Row structs keep the SQL shape separate from the domain entities; the
//! `TryFrom` conversions are where stored strings are parsed back into the
//! state-machine enums.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use vod_models::{Job, JobId, ResourceId, Video, VideoId};

use crate::error::RepoError;
use crate::{Database, UnitOfWork};

/// Postgres-backed [`Database`].
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to the database and verify the connection.
    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), RepoError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// One Postgres transaction. Dropping it without committing rolls back
/// (sqlx transaction drop semantics).
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[derive(FromRow)]
struct VideoRow {
    id: String,
    title: String,
    description: String,
    duration: i64,
    filename: String,
    resource_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for Video {
    type Error = RepoError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let duration_ns = u64::try_from(row.duration)
            .map_err(|_| RepoError::Decode(format!("negative duration: {}", row.duration)))?;
        let status = row
            .status
            .parse()
            .map_err(|e: vod_models::VideoError| RepoError::Decode(e.to_string()))?;

        Ok(Video {
            id: VideoId::from_string(row.id),
            title: row.title,
            description: row.description,
            duration: std::time::Duration::from_nanos(duration_ns),
            filename: row.filename,
            resource_id: ResourceId::from_string(row.resource_id),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    video_id: String,
    #[sqlx(rename = "type")]
    job_type: String,
    status: String,
    result: String,
    error_msg: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = RepoError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let job_type = row
            .job_type
            .parse()
            .map_err(|e: vod_models::JobError| RepoError::Decode(e.to_string()))?;
        let status = row
            .status
            .parse()
            .map_err(|e: vod_models::JobError| RepoError::Decode(e.to_string()))?;

        Ok(Job {
            id: JobId::from_string(row.id),
            video_id: VideoId::from_string(row.video_id),
            job_type,
            status,
            result: row.result,
            error_msg: row.error_msg,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn save_video(&mut self, video: &Video) -> Result<(), RepoError> {
        let duration_ns = video.duration.as_nanos() as i64;

        sqlx::query(
            r#"
            INSERT INTO videos (id, title, description, duration, filename,
                                resource_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                duration = EXCLUDED.duration,
                filename = EXCLUDED.filename,
                resource_id = EXCLUDED.resource_id,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(video.id.as_str())
        .bind(&video.title)
        .bind(&video.description)
        .bind(duration_ns)
        .bind(&video.filename)
        .bind(video.resource_id.as_str())
        .bind(video.status.as_str())
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_video(&mut self, id: &VideoId) -> Result<Video, RepoError> {
        let row: Option<VideoRow> = sqlx::query_as(
            r#"
            SELECT id, title, description, duration, filename,
                   resource_id, status, created_at, updated_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.ok_or(RepoError::NotFound)?.try_into()
    }

    async fn save_job(&mut self, job: &Job) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, video_id, type, status,
                              result, error_msg, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                result = EXCLUDED.result,
                error_msg = EXCLUDED.error_msg,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.video_id.as_str())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(&job.result)
        .bind(&job.error_msg)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_job_by_video_id(&mut self, video_id: &VideoId) -> Result<Job, RepoError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT id, video_id, type, status, result, error_msg, created_at, updated_at
            FROM jobs
            WHERE video_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(video_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.ok_or(RepoError::NotFound)?.try_into()
    }

    async fn find_next_pending_transcode_job(&mut self) -> Result<Option<Job>, RepoError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT id, video_id, type, status, result, error_msg, created_at, updated_at
            FROM jobs
            WHERE status = 'pending' AND type = 'transcode'
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn video_row_maps_onto_the_entity() {
        let row = VideoRow {
            id: "v1".into(),
            title: "t".into(),
            description: "d".into(),
            duration: 120_000_000_000,
            filename: "a.mp4".into(),
            resource_id: "r1".into(),
            status: "published".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 5, 0).unwrap(),
        };

        let video = Video::try_from(row).unwrap();
        assert_eq!(video.id.as_str(), "v1");
        assert_eq!(video.duration, std::time::Duration::from_secs(120));
        assert!(video.is_published());
    }

    #[test]
    fn video_row_rejects_negative_duration() {
        let row = VideoRow {
            id: "v1".into(),
            title: "t".into(),
            description: "d".into(),
            duration: -1,
            filename: "a.mp4".into(),
            resource_id: "r1".into(),
            status: "pending".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(matches!(Video::try_from(row), Err(RepoError::Decode(_))));
    }

    #[test]
    fn job_row_rejects_unknown_status() {
        let row = JobRow {
            id: "j1".into(),
            video_id: "v1".into(),
            job_type: "transcode".into(),
            status: "paused".into(),
            result: String::new(),
            error_msg: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(matches!(Job::try_from(row), Err(RepoError::Decode(_))));
    }
}
