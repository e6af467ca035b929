use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::error::WorkspaceError;

/// One job's isolated on-disk arena: a single input slot plus an output
/// directory for the engine to fill.
#[derive(Debug)]
pub struct Workspace {
    pub job_id: String,
    dir: PathBuf,
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join("input.mp4")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.join("output")
    }
}

/// Hands out per-job workspaces under a shared root. The allocation
/// table enforces at most one in-flight pipeline per job id.
#[derive(Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    active: Arc<Mutex<HashSet<String>>>,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn allocate(&self, job_id: &str) -> Result<Workspace, WorkspaceError> {
        if !is_safe_component(job_id) {
            return Err(WorkspaceError::UnsafeJobId(job_id.to_string()));
        }

        {
            let mut active = self.active.lock().unwrap();
            if !active.insert(job_id.to_string()) {
                return Err(WorkspaceError::AlreadyExists(job_id.to_string()));
            }
        }

        let dir = self.root.join(job_id);
        match self.materialize(&dir).await {
            Ok(()) => Ok(Workspace {
                job_id: job_id.to_string(),
                dir,
            }),
            Err(e) => {
                self.active.lock().unwrap().remove(job_id);
                if e.kind() == ErrorKind::AlreadyExists {
                    // Leftover directory from a previous crash; refuse to
                    // reuse files a prior run may have left behind.
                    Err(WorkspaceError::AlreadyExists(job_id.to_string()))
                } else {
                    Err(WorkspaceError::Io(e))
                }
            }
        }
    }

    async fn materialize(&self, dir: &Path) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir(dir).await?;
        tokio::fs::create_dir(dir.join("output")).await?;
        Ok(())
    }

    /// Removes the workspace tree and frees the allocation slot. Safe to
    /// call more than once; a missing directory is not an error.
    pub async fn release(&self, workspace: &Workspace) {
        if let Err(e) = tokio::fs::remove_dir_all(workspace.dir()).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(job_id = %workspace.job_id, error = %e, "failed to remove workspace");
            }
        }
        self.active.lock().unwrap().remove(&workspace.job_id);
    }
}

/// A job id doubles as a directory name, so it must not be able to
/// escape the workspace root.
pub fn is_safe_component(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !id.starts_with('.')
}
