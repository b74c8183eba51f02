use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Object storage addressed by public URL.
///
/// Every object is identified by the URL returned from `put`. The same URL is
/// what edit forms embed in records and what the upload trackers hold.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a fresh key inside `folder` and return the object URL.
    async fn put(
        &self,
        folder: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(folder, file_name, reader).await
    }

    /// Store data from an async reader and return the object URL.
    async fn put_stream(
        &self,
        folder: &str,
        file_name: &str,
        reader: BoxReader,
    ) -> Result<String, StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(url).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, url: &str) -> Result<BoxReader, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, url: &str) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    /// Deleting a missing object is not an error.
    async fn delete(&self, url: &str) -> Result<bool, StorageError>;

    /// Public base URL under which this store serves its objects.
    fn base_url(&self) -> &str;
}
