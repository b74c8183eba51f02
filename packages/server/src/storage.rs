use std::sync::Arc;

use common::storage::filesystem::FilesystemObjectStore;
use common::storage::{ObjectStore, StorageError};
use tracing::info;

use crate::config::{StorageAppConfig, StorageBackend};

#[derive(Debug, thiserror::Error)]
pub enum StoreInitError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[cfg(feature = "object-storage")]
    #[error("storage.backend is \"s3\" but no [storage.s3] section is configured")]
    MissingS3Config,

    #[cfg(not(feature = "object-storage"))]
    #[error("storage.backend is \"s3\" but the server was built without the object-storage feature")]
    S3Unavailable,
}

/// Build the object store selected by the configuration.
pub async fn init_store(config: &StorageAppConfig) -> Result<Arc<dyn ObjectStore>, StoreInitError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemObjectStore::new(
                config.root.clone(),
                config.public_base_url.clone(),
                config.max_object_size,
            )
            .await?;
            info!(root = %config.root.display(), "Using filesystem object storage");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => init_s3(config),
    }
}

#[cfg(feature = "object-storage")]
fn init_s3(config: &StorageAppConfig) -> Result<Arc<dyn ObjectStore>, StoreInitError> {
    use common::storage::s3::S3ObjectStore;

    let s3 = config.s3.as_ref().ok_or(StoreInitError::MissingS3Config)?;
    let store = S3ObjectStore::new(s3, config.public_base_url.clone(), config.max_object_size)?;
    info!(bucket = %s3.bucket, endpoint = %s3.endpoint, "Using S3 object storage");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "object-storage"))]
fn init_s3(_config: &StorageAppConfig) -> Result<Arc<dyn ObjectStore>, StoreInitError> {
    Err(StoreInitError::S3Unavailable)
}
