use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{BoxReader, ObjectStore};

/// Internal state for [`MemoryObjectStore`], grouped for a single lock.
#[derive(Default)]
struct MemoryState {
    /// url -> content
    objects: HashMap<String, Vec<u8>>,
    /// Every delete call in call order, including failed ones.
    delete_attempts: Vec<String>,
    /// URLs whose deletion should fail.
    fail_delete: HashSet<String>,
}

/// In-memory object store.
///
/// Useful for embedding the editor in tests: it records every deletion
/// attempt and can be told to fail deletions for specific URLs.
#[derive(Clone)]
pub struct MemoryObjectStore {
    base_url: String,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object that already exists, e.g. an image of a saved record.
    pub fn insert(&self, url: impl Into<String>, content: Vec<u8>) {
        self.state().objects.insert(url.into(), content);
    }

    /// Make every deletion of `url` fail with a backend error.
    pub fn fail_delete_for(&self, url: impl Into<String>) {
        self.state().fail_delete.insert(url.into());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state().objects.contains_key(url)
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    /// All delete calls received so far, in order.
    pub fn delete_attempts(&self) -> Vec<String> {
        self.state().delete_attempts.clone()
    }

    /// Number of delete calls received for `url`.
    pub fn delete_attempts_for(&self, url: &str) -> usize {
        self.state()
            .delete_attempts
            .iter()
            .filter(|attempt| attempt.as_str() == url)
            .count()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_stream(
        &self,
        folder: &str,
        file_name: &str,
        mut reader: BoxReader,
    ) -> Result<String, StorageError> {
        let key = ObjectKey::generate(folder, file_name)?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;

        let url = key.to_url(&self.base_url);
        self.state().objects.insert(url.clone(), content);
        Ok(url)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        self.state()
            .objects
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(url.to_string()))
    }

    async fn get_stream(&self, url: &str) -> Result<BoxReader, StorageError> {
        let content = self.get(url).await?;
        Ok(Box::new(std::io::Cursor::new(content)))
    }

    async fn exists(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.state().objects.contains_key(url))
    }

    async fn delete(&self, url: &str) -> Result<bool, StorageError> {
        let mut state = self.state();
        state.delete_attempts.push(url.to_string());

        if state.fail_delete.contains(url) {
            return Err(StorageError::Backend(format!("simulated failure for {url}")));
        }

        Ok(state.objects.remove(url).is_some())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
