use std::collections::HashSet;
use std::sync::Arc;

use common::storage::ObjectStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::report::{CleanupReport, delete_best_effort};

/// Where an edit cycle stands with respect to its stored images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing uploaded or removed yet.
    Clean,
    /// At least one upload or removal is waiting for save or discard.
    Tracking,
    /// Saved: staged removals applied, uploads adopted by the record.
    Saved,
    /// Discarded: uploads deleted, staged removals dropped.
    Discarded,
}

/// Tracks images uploaded during an edit session that no saved record owns
/// yet, and images removed in the form whose deletion waits for a save.
///
/// Both sets belong to exactly one session. Dropping the tracker while it
/// still holds uploads from an unsaved session deletes them in the
/// background.
pub struct UploadTracker {
    store: Arc<dyn ObjectStore>,
    /// Uploaded this session, not yet part of a saved record.
    tracked: HashSet<String>,
    /// Removed in the form, still referenced by the last saved record.
    staged: HashSet<String>,
    saved: bool,
    discarded: bool,
}

/// Trimmed identifier, or `None` for empty and whitespace-only input.
fn normalize(identifier: &str) -> Option<&str> {
    let trimmed = identifier.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl UploadTracker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            tracked: HashSet::new(),
            staged: HashSet::new(),
            saved: false,
            discarded: false,
        }
    }

    /// Remember an upload made in this session.
    ///
    /// Returns `false` (and changes nothing) for empty or whitespace input.
    /// Tracking after a save or discard starts a new edit cycle.
    pub fn track_uploaded_image(&mut self, identifier: &str) -> bool {
        let Some(identifier) = normalize(identifier) else {
            return false;
        };
        self.begin_cycle();
        if self.tracked.insert(identifier.to_string()) {
            debug!(url = identifier, "Tracking uploaded image");
        }
        true
    }

    /// Forget a single upload because a saved record now references it.
    pub fn stop_tracking_image(&mut self, identifier: &str) {
        if let Some(identifier) = normalize(identifier) {
            self.tracked.remove(identifier);
        }
    }

    /// Stage a removal of a previously saved image until the next save.
    ///
    /// Returns `false` (and changes nothing) for empty or whitespace input.
    pub fn track_deleted_image(&mut self, identifier: &str) -> bool {
        let Some(identifier) = normalize(identifier) else {
            return false;
        };
        self.begin_cycle();
        if self.staged.insert(identifier.to_string()) {
            debug!(url = identifier, "Staged image deletion");
        }
        true
    }

    /// Mark the session as saved and forget both sets without deleting
    /// anything. Call after the host has persisted the record.
    pub fn stop_tracking_all_images(&mut self) {
        self.saved = true;
        self.discarded = false;
        self.tracked.clear();
        self.staged.clear();
    }

    /// Alias of [`UploadTracker::stop_tracking_all_images`].
    pub fn mark_as_saved(&mut self) {
        self.stop_tracking_all_images();
    }

    /// Delete every staged image once, best-effort, then clear the staged set
    /// whatever the individual outcomes were.
    pub async fn process_deleted_images(&mut self) -> CleanupReport {
        let staged: Vec<String> = self.staged.drain().collect();
        delete_best_effort(self.store.as_ref(), staged).await
    }

    /// Discard: delete every tracked upload once, best-effort, and drop the
    /// staged removals without touching their files.
    pub async fn perform_cleanup(&mut self) -> CleanupReport {
        let tracked: Vec<String> = self.tracked.drain().collect();
        self.staged.clear();
        self.saved = false;
        self.discarded = true;
        delete_best_effort(self.store.as_ref(), tracked).await
    }

    fn begin_cycle(&mut self) {
        self.saved = false;
        self.discarded = false;
    }

    pub fn is_tracking(&self, identifier: &str) -> bool {
        normalize(identifier).is_some_and(|id| self.tracked.contains(id))
    }

    pub fn is_staged(&self, identifier: &str) -> bool {
        normalize(identifier).is_some_and(|id| self.staged.contains(id))
    }

    /// Sorted snapshot of the tracked uploads.
    pub fn tracked_uploads(&self) -> Vec<String> {
        let mut uploads: Vec<String> = self.tracked.iter().cloned().collect();
        uploads.sort();
        uploads
    }

    /// Sorted snapshot of the staged deletions.
    pub fn staged_deletions(&self) -> Vec<String> {
        let mut staged: Vec<String> = self.staged.iter().cloned().collect();
        staged.sort();
        staged
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn state(&self) -> SessionState {
        if !self.tracked.is_empty() || !self.staged.is_empty() {
            SessionState::Tracking
        } else if self.saved {
            SessionState::Saved
        } else if self.discarded {
            SessionState::Discarded
        } else {
            SessionState::Clean
        }
    }
}

impl Drop for UploadTracker {
    fn drop(&mut self) {
        if self.saved || self.tracked.is_empty() {
            return;
        }

        let orphans: Vec<String> = self.tracked.drain().collect();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                debug!(count = orphans.len(), "Cleaning up uploads of an unsaved session");
                handle.spawn(async move {
                    delete_best_effort(store.as_ref(), orphans).await;
                });
            }
            Err(_) => {
                warn!(
                    count = orphans.len(),
                    urls = ?orphans,
                    "No async runtime at teardown; uploads left in storage"
                );
            }
        }
    }
}
