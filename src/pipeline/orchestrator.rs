use std::time::Duration;
use tracing::{error, info};

use super::assemble::PackageAssembler;
use super::error::{AssembleError, PipelineError};
use super::fetch::SourceFetcher;
use super::transcode::TranscodeAdapter;
use super::workspace::Workspace;
use crate::modules::job::dto::SourceLocator;
use crate::modules::job::model::{JobRecord, JobStatus};
use crate::modules::job::repository::RecordError;
use crate::state::AppState;

/// Stages of one pipeline run. `Ready` and `Failed` are terminal and
/// both end with the workspace released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStage {
    Pending,
    Fetching,
    Transcoding,
    Packaging,
    Committing,
    Ready,
    Failed,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStage::Pending => "pending",
            JobStage::Fetching => "fetching",
            JobStage::Transcoding => "transcoding",
            JobStage::Packaging => "packaging",
            JobStage::Committing => "committing",
            JobStage::Ready => "ready",
            JobStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub manifest_url: String,
    pub job: JobRecord,
}

/// Runs the whole conversion for one job. Owns the two guarantees the
/// stages themselves cannot give: the record always reaches a terminal
/// status, and the workspace is always released, however the run ends.
pub async fn run(
    state: &AppState,
    workspace: Workspace,
    locator: &SourceLocator,
) -> Result<PipelineOutcome, PipelineError> {
    let job_id = workspace.job_id.clone();

    let result = drive(state, &workspace, locator).await;
    let outcome = match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            error!(job_id = %job_id, stage = %JobStage::Failed, error = %e, "pipeline failed");
            let commit_timeout = Duration::from_secs(state.config.commit_timeout_secs);
            match tokio::time::timeout(
                commit_timeout,
                state.jobs.mark_failed(&job_id, &e.detail()),
            )
            .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(commit_err)) => {
                    error!(job_id = %job_id, error = %commit_err, "could not persist failure status");
                }
                Err(_) => {
                    error!(job_id = %job_id, "failure-status write timed out");
                }
            }
            Err(e)
        }
    };

    state.workspaces.release(&workspace).await;
    outcome
}

async fn drive(
    state: &AppState,
    workspace: &Workspace,
    locator: &SourceLocator,
) -> Result<PipelineOutcome, PipelineError> {
    let job_id = workspace.job_id.as_str();
    let config = &state.config;

    // Every remote write carries its own deadline so a hung store cannot
    // pin the job (and its HTTP request) forever.
    let commit_timeout = Duration::from_secs(config.commit_timeout_secs);

    tokio::time::timeout(
        commit_timeout,
        state.jobs.set_status(job_id, JobStatus::Processing),
    )
    .await
    .map_err(|_| RecordError::Timeout)??;

    info!(job_id, stage = %JobStage::Fetching, url = %locator.url, "downloading source");
    let fetcher = SourceFetcher::new(Duration::from_secs(config.fetch_timeout_secs));
    let input = fetcher.fetch(locator, workspace).await?;

    info!(job_id, stage = %JobStage::Transcoding, "invoking engine");
    let adapter = TranscodeAdapter::new(
        config.ffmpeg_path.clone(),
        config.segment_seconds,
        Duration::from_secs(config.transcode_timeout_secs),
    );
    let package = adapter.transcode(&input, workspace).await?;

    info!(job_id, stage = %JobStage::Packaging, manifest = %package.manifest_path.display(), "assembling package");
    let assembler = PackageAssembler::new(state.storage.clone(), config.upload_concurrency);
    let manifest_url = tokio::time::timeout(
        Duration::from_secs(config.assemble_timeout_secs),
        assembler.assemble(job_id, &workspace.output_dir()),
    )
    .await
    .map_err(|_| AssembleError::Timeout)??;

    info!(job_id, stage = %JobStage::Committing, "committing job record");
    let job = tokio::time::timeout(commit_timeout, state.jobs.mark_ready(job_id, &manifest_url))
        .await
        .map_err(|_| RecordError::Timeout)??;

    info!(job_id, stage = %JobStage::Ready, manifest_url = %manifest_url, "pipeline complete");
    Ok(PipelineOutcome { manifest_url, job })
}
