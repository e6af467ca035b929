use async_trait::async_trait;

use super::model::{JobRecord, JobStatus};
use crate::infrastructure::db::pool::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("job '{0}' not found")]
    NotFound(String),
    #[error("record store failure: {0}")]
    Store(String),
    #[error("record store operation timed out")]
    Timeout,
}

/// Narrow capability interface over the durable job record, mirroring
/// the document store's get/update operations. Injected so the pipeline
/// can run against an in-memory double in tests.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Result<JobRecord, RecordError>;
    async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<JobRecord, RecordError>;
    /// The single success commit: terminal `ready` plus the manifest
    /// address, written only after every upload has landed.
    async fn mark_ready(&self, job_id: &str, manifest_url: &str)
    -> Result<JobRecord, RecordError>;
    async fn mark_failed(&self, job_id: &str, error_detail: &str)
    -> Result<JobRecord, RecordError>;
}

pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn map_err(job_id: &str, e: sqlx::Error) -> RecordError {
        match e {
            sqlx::Error::RowNotFound => RecordError::NotFound(job_id.to_string()),
            other => RecordError::Store(other.to_string()),
        }
    }
}

const RECORD_COLUMNS: &str = "id, status, source_url, transcoded_url, error_detail, updated_at";

#[async_trait]
impl JobStore for PgJobStore {
    async fn get(&self, job_id: &str) -> Result<JobRecord, RecordError> {
        sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(job_id, e))
    }

    async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<JobRecord, RecordError> {
        sqlx::query_as::<_, JobRecord>(&format!(
            "UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(job_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(job_id, e))
    }

    async fn mark_ready(
        &self,
        job_id: &str,
        manifest_url: &str,
    ) -> Result<JobRecord, RecordError> {
        sqlx::query_as::<_, JobRecord>(&format!(
            "UPDATE jobs SET status = 'ready', transcoded_url = $2, error_detail = NULL, \
             updated_at = NOW() WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(job_id)
        .bind(manifest_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(job_id, e))
    }

    async fn mark_failed(
        &self,
        job_id: &str,
        error_detail: &str,
    ) -> Result<JobRecord, RecordError> {
        sqlx::query_as::<_, JobRecord>(&format!(
            "UPDATE jobs SET status = 'failed', error_detail = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(job_id)
        .bind(error_detail)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(job_id, e))
    }
}
