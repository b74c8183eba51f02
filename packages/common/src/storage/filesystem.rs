use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{BoxReader, ObjectStore};

/// Filesystem-backed object store.
///
/// Objects live at `{base_path}/{key}` and are served under
/// `{base_url}/{key}`. Writes go to `{base_path}/.tmp` first and are renamed
/// into place, so readers never observe a partial object.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    base_url: String,
    max_size: u64,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(
        base_path: PathBuf,
        base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_size,
        })
    }

    /// Compute the filesystem path for a given key.
    fn object_path(&self, key: &ObjectKey) -> PathBuf {
        key.as_str()
            .split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn resolve(&self, url: &str) -> Result<(ObjectKey, PathBuf), StorageError> {
        let key = ObjectKey::from_url(&self.base_url, url)?;
        let path = self.object_path(&key);
        Ok((key, path))
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put_stream(
        &self,
        folder: &str,
        file_name: &str,
        mut reader: BoxReader,
    ) -> Result<String, StorageError> {
        let key = ObjectKey::generate(folder, file_name)?;
        let temp_path = self.temp_path();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        let object_path = self.object_path(&key);
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(key = %key, size = total_bytes, "Stored object");
        Ok(key.to_url(&self.base_url))
    }

    async fn get_stream(&self, url: &str) -> Result<BoxReader, StorageError> {
        let (_, path) = self.resolve(url)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, url: &str) -> Result<bool, StorageError> {
        let (_, path) = self.resolve(url)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, url: &str) -> Result<bool, StorageError> {
        let (_, path) = self.resolve(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
