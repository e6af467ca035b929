use async_trait::async_trait;
use bytes::Bytes;

pub mod s3;

/// One uploaded artifact: the store's identifier plus the absolute
/// address a playback client can fetch it from.
#[derive(Clone, Debug)]
pub struct RemoteAsset {
    pub id: String,
    pub address: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload of '{name}' failed: {detail}")]
    Upload { name: String, detail: String },
}

/// Narrow capability interface over the remote object store, so the
/// pipeline can be exercised against an in-memory double in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<RemoteAsset, StorageError>;
}
