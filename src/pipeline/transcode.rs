use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::error::TranscodeError;
use super::workspace::Workspace;

const MANIFEST_NAME: &str = "output.m3u8";
const STDERR_LIMIT: usize = 4096;

/// The transcode output: the manifest plus the segment files sitting
/// next to it in the workspace output directory.
#[derive(Debug)]
pub struct Package {
    pub manifest_path: PathBuf,
}

/// Runs the external engine as a subprocess with a fixed argument
/// vector. Paths are passed as discrete arguments, never interpolated
/// into a shell line, so adversarial filenames cannot inject options.
pub struct TranscodeAdapter {
    engine_path: String,
    segment_seconds: u32,
    timeout: Duration,
}

impl TranscodeAdapter {
    pub fn new(engine_path: impl Into<String>, segment_seconds: u32, timeout: Duration) -> Self {
        Self {
            engine_path: engine_path.into(),
            segment_seconds,
            timeout,
        }
    }

    pub async fn transcode(
        &self,
        input: &Path,
        workspace: &Workspace,
    ) -> Result<Package, TranscodeError> {
        let manifest_path = workspace.output_dir().join(MANIFEST_NAME);

        let mut cmd = Command::new(&self.engine_path);
        cmd.arg("-i")
            .arg(input)
            // Stream-copy: no re-encode, fixed segment length, keep the
            // full playlist.
            .arg("-c")
            .arg("copy")
            .arg("-start_number")
            .arg("0")
            .arg("-hls_time")
            .arg(self.segment_seconds.to_string())
            .arg("-hls_list_size")
            .arg("0")
            .arg("-f")
            .arg("hls")
            .arg(&manifest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If the timeout below fires we drop the wait future, and
            // this reaps the engine instead of leaving it running.
            .kill_on_drop(true);

        debug!(job_id = %workspace.job_id, engine = %self.engine_path, "invoking engine");

        let child = cmd.spawn()?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(TranscodeError::Timeout),
        };

        if !output.status.success() {
            let diagnostics: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(STDERR_LIMIT)
                .collect();
            return Err(TranscodeError::EngineFailure {
                exit_code: output.status.code().unwrap_or(-1),
                diagnostics,
            });
        }

        // The engine can exit zero without writing anything; never trust
        // the exit code alone.
        if !tokio::fs::try_exists(&manifest_path).await? {
            return Err(TranscodeError::MissingManifest);
        }

        info!(job_id = %workspace.job_id, manifest = %manifest_path.display(), "transcode complete");
        Ok(Package { manifest_path })
    }
}
