use crate::modules::job::repository::RecordError;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace for job '{0}' is already allocated")]
    AlreadyExists(String),
    #[error("job id '{0}' is not a safe path component")]
    UnsafeJobId(String),
    #[error("workspace io failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source rejected the download with status {0}")]
    Auth(u16),
    #[error("source fetch failed: {0}")]
    Network(String),
    #[error("source fetch io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("source fetch timed out")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("engine exited with code {exit_code}: {diagnostics}")]
    EngineFailure { exit_code: i32, diagnostics: String },
    #[error("engine exceeded the transcode deadline and was killed")]
    Timeout,
    #[error("engine exited cleanly but produced no manifest")]
    MissingManifest,
    #[error("engine io failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("package layout invalid: {0}")]
    Layout(String),
    #[error("upload of '{name}' failed: {detail}")]
    UploadFailure { name: String, detail: String },
    #[error("manifest references unknown segment '{0}'")]
    RewriteFailure(String),
    #[error("package assembly exceeded its deadline")]
    Timeout,
    #[error("assemble io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella over every stage failure. `kind` feeds the `error` field of
/// the HTTP 500 body and the prefix of the persisted `error_detail`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Commit(#[from] RecordError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Workspace(_) => "WorkspaceError",
            PipelineError::Fetch(_) => "FetchError",
            PipelineError::Transcode(_) => "TranscodeError",
            PipelineError::Assemble(_) => "AssembleError",
            PipelineError::Commit(_) => "CommitError",
        }
    }

    /// Terse diagnostic persisted as the job's `error_detail`.
    pub fn detail(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
