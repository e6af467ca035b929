//! In-memory doubles for the object and record stores, plus an
//! [`AppState`] builder for pipeline and handler tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::{ObjectStore, RemoteAsset, StorageError};
use crate::modules::job::model::{JobRecord, JobStatus};
use crate::modules::job::repository::{JobStore, RecordError};
use crate::pipeline::workspace::WorkspaceManager;
use crate::state::AppState;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail: bool,
    hang: bool,
}

impl MemoryObjectStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Uploads never resolve, standing in for an unresponsive store.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> HashMap<String, Vec<u8>> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        name: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<RemoteAsset, StorageError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(StorageError::Upload {
                name: name.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), body.to_vec());
        Ok(RemoteAsset {
            id: name.to_string(),
            address: format!("http://store.local/streams/{name}"),
        })
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<HashMap<String, JobRecord>>,
    hang_on_ready: bool,
}

impl MemoryJobStore {
    pub fn with_pending(job_id: &str) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(
            job_id.to_string(),
            JobRecord {
                id: job_id.to_string(),
                status: JobStatus::Pending.as_str().to_string(),
                source_url: None,
                transcoded_url: None,
                error_detail: None,
                updated_at: OffsetDateTime::now_utc(),
            },
        );
        store
    }

    /// Like [`with_pending`](Self::with_pending), but the ready commit
    /// never resolves; failure writes still work.
    pub fn with_pending_hanging_on_ready(job_id: &str) -> Self {
        let mut store = Self::with_pending(job_id);
        store.hang_on_ready = true;
        store
    }

    fn update<F>(&self, job_id: &str, f: F) -> Result<JobRecord, RecordError>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| RecordError::NotFound(job_id.to_string()))?;
        f(record);
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, job_id: &str) -> Result<JobRecord, RecordError> {
        self.records
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| RecordError::NotFound(job_id.to_string()))
    }

    async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<JobRecord, RecordError> {
        self.update(job_id, |r| r.status = status.as_str().to_string())
    }

    async fn mark_ready(
        &self,
        job_id: &str,
        manifest_url: &str,
    ) -> Result<JobRecord, RecordError> {
        if self.hang_on_ready {
            std::future::pending::<()>().await;
        }
        self.update(job_id, |r| {
            r.status = JobStatus::Ready.as_str().to_string();
            r.transcoded_url = Some(manifest_url.to_string());
            r.error_detail = None;
        })
    }

    async fn mark_failed(
        &self,
        job_id: &str,
        error_detail: &str,
    ) -> Result<JobRecord, RecordError> {
        self.update(job_id, |r| {
            r.status = JobStatus::Failed.as_str().to_string();
            r.error_detail = Some(error_detail.to_string());
        })
    }
}

pub fn test_state(
    workspace_root: &Path,
    engine_path: &str,
    jobs: Arc<dyn JobStore>,
    storage: Arc<dyn ObjectStore>,
) -> AppState {
    let config = AppConfig {
        server_port: 0,
        database_url: String::new(),
        minio_url: "http://store.local".to_string(),
        minio_bucket: "streams".to_string(),
        minio_access_key: String::new(),
        minio_secret_key: String::new(),
        ffmpeg_path: engine_path.to_string(),
        workspace_root: workspace_root.to_string_lossy().into_owned(),
        segment_seconds: 10,
        fetch_timeout_secs: 5,
        transcode_timeout_secs: 5,
        assemble_timeout_secs: 2,
        commit_timeout_secs: 2,
        upload_concurrency: 2,
    };
    let workspaces = WorkspaceManager::new(workspace_root);
    AppState::new(config, jobs, storage, workspaces)
}
