use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{BoxReader, ObjectStore};
use crate::config::S3StorageConfig;

/// S3-compatible object store (AWS, Backblaze B2, MinIO, ...).
///
/// Object keys are the same as for the filesystem backend; `base_url` is the
/// public (CDN or bucket website) address the objects are served from.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    base_url: String,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(
        config: &S3StorageConfig,
        base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        // Missing keys fall back to the standard AWS environment variables.
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("credentials error: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(s3_error)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_size,
        })
    }

    fn key_for(&self, url: &str) -> Result<ObjectKey, StorageError> {
        ObjectKey::from_url(&self.base_url, url)
    }
}

fn s3_error(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_success(code: u16) -> bool {
    (200..300).contains(&code)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_stream(
        &self,
        folder: &str,
        file_name: &str,
        mut reader: BoxReader,
    ) -> Result<String, StorageError> {
        let key = ObjectKey::generate(folder, file_name)?;

        let mut data = Vec::new();
        (&mut reader).take(self.max_size.saturating_add(1)).read_to_end(&mut data).await?;
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let content_type = mime_guess::from_path(key.file_name())
            .first_or_octet_stream()
            .to_string();

        let response = self
            .bucket
            .put_object_with_content_type(key.as_str(), &data, &content_type)
            .await
            .map_err(s3_error)?;
        if !is_success(response.status_code()) {
            return Err(StorageError::Backend(format!(
                "put {key} returned status {}",
                response.status_code()
            )));
        }

        tracing::debug!(key = %key, size = data.len(), "Stored object in bucket");
        Ok(key.to_url(&self.base_url))
    }

    async fn get_stream(&self, url: &str) -> Result<BoxReader, StorageError> {
        let key = self.key_for(url)?;
        let response = self
            .bucket
            .get_object(key.as_str())
            .await
            .map_err(s3_error)?;

        match response.status_code() {
            404 => Err(StorageError::NotFound(url.to_string())),
            code if is_success(code) => {
                Ok(Box::new(std::io::Cursor::new(response.bytes().to_vec())))
            }
            code => Err(StorageError::Backend(format!(
                "get {key} returned status {code}"
            ))),
        }
    }

    async fn exists(&self, url: &str) -> Result<bool, StorageError> {
        let key = self.key_for(url)?;
        match self.bucket.head_object(key.as_str()).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, code)) if is_success(code) => Ok(true),
            Ok((_, code)) => Err(StorageError::Backend(format!(
                "head {key} returned status {code}"
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(s3_error(e)),
        }
    }

    /// S3 answers 204 whether or not the key existed, so this reports `true`
    /// for any accepted request.
    async fn delete(&self, url: &str) -> Result<bool, StorageError> {
        let key = self.key_for(url)?;
        match self.bucket.delete_object(key.as_str()).await {
            Ok(response) if response.status_code() == 404 => Ok(false),
            Ok(response) if is_success(response.status_code()) => Ok(true),
            Ok(response) => Err(StorageError::Backend(format!(
                "delete {key} returned status {}",
                response.status_code()
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(s3_error(e)),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
