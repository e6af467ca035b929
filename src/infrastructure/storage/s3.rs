use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::info;

use super::{ObjectStore, RemoteAsset, StorageError};

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    pub public_url: String,
}

impl StorageService {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        // Path-style addressing, matching force_path_style above.
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn upload(
        &self,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<RemoteAsset, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                name: name.to_string(),
                detail: e.to_string(),
            })?;

        Ok(RemoteAsset {
            id: name.to_string(),
            address: self.object_url(name),
        })
    }
}
