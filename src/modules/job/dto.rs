use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use super::model::JobRecord;

/// Where to pull the source media from, plus any auth headers the
/// origin requires (the upload service stores originals behind a keyed
/// endpoint).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocator {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeRequest {
    pub job_id: String,
    pub source_locator: SourceLocator,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeResponse {
    pub manifest_url: String,
    pub job: JobRecord,
}
