use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    FfmpegPath,
    WorkspaceRoot,
    SegmentSeconds,
    FetchTimeoutSecs,
    TranscodeTimeoutSecs,
    AssembleTimeoutSecs,
    CommitTimeoutSecs,
    UploadConcurrency,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_STREAMS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::WorkspaceRoot => "WORKSPACE_ROOT",
            EnvKey::SegmentSeconds => "HLS_SEGMENT_SECONDS",
            EnvKey::FetchTimeoutSecs => "FETCH_TIMEOUT_SECS",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::AssembleTimeoutSecs => "ASSEMBLE_TIMEOUT_SECS",
            EnvKey::CommitTimeoutSecs => "COMMIT_TIMEOUT_SECS",
            EnvKey::UploadConcurrency => "UPLOAD_CONCURRENCY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
