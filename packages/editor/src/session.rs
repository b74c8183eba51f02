use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::storage::ObjectStore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::navigation::{Navigator, UnsavedChangeTracker};
use crate::report::CleanupReport;
use crate::uploads::{SessionState, UploadTracker};

/// One open admin edit form, from `open` to `close`.
///
/// `close` is the explicit end of the session. A session that is dropped
/// without being closed still releases its unsaved uploads through
/// [`UploadTracker`]'s drop cleanup.
pub struct EditSession<N> {
    id: Uuid,
    opened_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    uploads: UploadTracker,
    changes: UnsavedChangeTracker<N>,
}

impl<N: Navigator> EditSession<N> {
    pub fn open(store: Arc<dyn ObjectStore>, navigator: N) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        debug!(session_id = %id, location = navigator.location(), "Edit session opened");
        Self {
            id,
            opened_at: now,
            last_activity: now,
            uploads: UploadTracker::new(store),
            changes: UnsavedChangeTracker::new(navigator),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadTracker {
        &mut self.uploads
    }

    pub fn changes(&self) -> &UnsavedChangeTracker<N> {
        &self.changes
    }

    pub fn changes_mut(&mut self) -> &mut UnsavedChangeTracker<N> {
        &mut self.changes
    }

    pub fn state(&self) -> SessionState {
        self.uploads.state()
    }

    /// The host stored a new image for this form.
    pub fn record_upload(&mut self, url: &str) {
        if self.uploads.track_uploaded_image(url) {
            self.changes.set_has_unsaved_changes(true);
        }
    }

    /// The user removed a previously saved image from the form.
    pub fn record_removal(&mut self, url: &str) {
        if self.uploads.track_deleted_image(url) {
            self.changes.set_has_unsaved_changes(true);
        }
    }

    /// A single upload became part of a saved record ahead of a full save.
    pub fn adopt_upload(&mut self, url: &str) {
        self.uploads.stop_tracking_image(url);
    }

    /// The host has persisted the record: apply staged removals, adopt all
    /// uploads and mark the form clean.
    pub async fn commit_saved(&mut self) -> CleanupReport {
        let report = self.uploads.process_deleted_images().await;
        self.uploads.mark_as_saved();
        self.changes.set_has_unsaved_changes(false);
        info!(session_id = %self.id, removed = report.deleted.len(), "Edit session saved");
        report
    }

    /// Throw away the edits: delete this session's uploads, keep the saved
    /// record's images, mark the form clean and dismiss any prompt.
    pub async fn discard(&mut self) -> CleanupReport {
        let report = self.uploads.perform_cleanup().await;
        self.changes.set_has_unsaved_changes(false);
        self.changes.cancel_navigation();
        info!(session_id = %self.id, purged = report.deleted.len(), "Edit session discarded");
        report
    }

    /// The user confirmed leaving for the pending target. Uploads are purged
    /// before the navigator moves.
    ///
    /// Returns `None` (and does nothing) when no navigation is pending.
    pub async fn confirm_discard_and_navigate(&mut self) -> Option<(String, CleanupReport)> {
        self.changes.pending_target()?;
        let report = self.uploads.perform_cleanup().await;
        let target = self.changes.confirm_navigation()?;
        Some((target, report))
    }

    /// End the session. Unsaved uploads are deleted and awaited here, so
    /// dropping the session afterwards has nothing left to clean up.
    pub async fn close(&mut self) -> CleanupReport {
        let report = if self.uploads.is_saved() {
            CleanupReport::default()
        } else {
            self.uploads.perform_cleanup().await
        };
        debug!(session_id = %self.id, attempted = report.attempted(), "Edit session closed");
        report
    }

    /// Record activity for idle sweeping.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }
}
