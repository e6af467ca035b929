use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::FetchError;
use super::workspace::Workspace;
use crate::modules::job::dto::SourceLocator;

/// Streams the source media into the workspace's input slot. Bytes are
/// written to a `.part` file and renamed only on completion, so a failed
/// download never leaves a partial file visible.
pub struct SourceFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn fetch(
        &self,
        locator: &SourceLocator,
        workspace: &Workspace,
    ) -> Result<PathBuf, FetchError> {
        let headers = build_headers(locator)?;

        let response = self
            .client
            .get(&locator.url)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Auth(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "source returned status {status}"
            )));
        }

        let part_path = workspace.dir().join("input.part");
        let final_path = workspace.input_path();

        let result = self.stream_to_file(response, &part_path).await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, &final_path).await?;
        debug!(job_id = %workspace.job_id, path = %final_path.display(), "source downloaded");
        Ok(final_path)
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        path: &std::path::Path,
    ) -> Result<(), FetchError> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn build_headers(locator: &SourceLocator) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(extra) = &locator.headers {
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::Network(format!("invalid header name '{name}'")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::Network(format!("invalid value for header '{name:?}'")))?;
            headers.insert(name, value);
        }
    }
    Ok(headers)
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}
