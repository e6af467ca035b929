use serde::Deserialize;
use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub ffmpeg_path: String,
    pub workspace_root: String,
    pub segment_seconds: u32,
    pub fetch_timeout_secs: u64,
    pub transcode_timeout_secs: u64,
    pub assemble_timeout_secs: u64,
    pub commit_timeout_secs: u64,
    pub upload_concurrency: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get(EnvKey::DatabaseUrl)?,
            minio_url: env::get(EnvKey::MinioUrl)?,
            minio_bucket: env::get(EnvKey::MinioBucket)?,
            minio_access_key: env::get(EnvKey::MinioAccessKey)?,
            minio_secret_key: env::get(EnvKey::MinioSecretKey)?,
            ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
            workspace_root: env::get_or(EnvKey::WorkspaceRoot, "/tmp/bingein-transcoder"),
            segment_seconds: env::get_parsed(EnvKey::SegmentSeconds, 10),
            fetch_timeout_secs: env::get_parsed(EnvKey::FetchTimeoutSecs, 300),
            transcode_timeout_secs: env::get_parsed(EnvKey::TranscodeTimeoutSecs, 900),
            assemble_timeout_secs: env::get_parsed(EnvKey::AssembleTimeoutSecs, 600),
            commit_timeout_secs: env::get_parsed(EnvKey::CommitTimeoutSecs, 30),
            upload_concurrency: env::get_parsed(EnvKey::UploadConcurrency, 4),
        })
    }
}
