use chrono::{DateTime, Utc};
use editor::{
    CleanupReport, EditSession, HistoryDecision, NavigationOutcome, Navigator, RouteNavigator,
    SessionState,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Snapshot of an edit session returned by every session endpoint.
#[derive(Serialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    /// Upload lifecycle state: `clean`, `tracking`, `saved` or `discarded`.
    #[schema(value_type = String, example = "tracking")]
    pub state: SessionState,
    /// Whether the form has unsaved changes.
    pub dirty: bool,
    /// Whether closing the browser tab should trigger the native prompt.
    pub block_exit: bool,
    /// Target held while the leave prompt is visible.
    #[schema(example = "/admin/news")]
    pub pending_target: Option<String>,
    /// Location the form's navigator currently shows.
    #[schema(example = "/admin/news/42")]
    pub location: String,
    /// Uploads that are deleted if the session is discarded.
    pub tracked_uploads: Vec<String>,
    /// Saved images whose deletion waits for a save.
    pub staged_deletions: Vec<String>,
    pub opened_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&EditSession<RouteNavigator>> for SessionView {
    fn from(session: &EditSession<RouteNavigator>) -> Self {
        let changes = session.changes();
        Self {
            id: session.id(),
            state: session.state(),
            dirty: changes.has_unsaved_changes(),
            block_exit: changes.should_block_exit(),
            pending_target: changes.pending_target().map(str::to_string),
            location: changes.navigator().location().to_string(),
            tracked_uploads: session.uploads().tracked_uploads(),
            staged_deletions: session.uploads().staged_deletions(),
            opened_at: session.opened_at(),
            last_activity: session.last_activity(),
        }
    }
}

/// Result of a best-effort deletion pass.
#[derive(Serialize, ToSchema)]
pub struct CleanupSummary {
    /// Objects that were deleted.
    pub deleted: Vec<String>,
    /// Objects that were already gone.
    pub missing: Vec<String>,
    /// Objects whose deletion failed and were left behind.
    pub failed: Vec<String>,
}

impl From<CleanupReport> for CleanupSummary {
    fn from(report: CleanupReport) -> Self {
        Self {
            deleted: report.deleted,
            missing: report.missing,
            failed: report.failed,
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
pub struct OpenSessionRequest {
    /// Location of the edit form. Defaults to `/`.
    #[schema(example = "/admin/news/42")]
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DirtyRequest {
    pub dirty: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ImageRequest {
    /// Object URL as returned by the upload endpoint.
    #[schema(example = "http://127.0.0.1:3000/media/uploads/0f8e-photo.png")]
    pub url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NavigateRequest {
    #[schema(example = "/admin/news")]
    pub target: String,
}

#[derive(Deserialize, ToSchema)]
pub struct HistoryRequest {
    /// Location the back/forward action moved away from.
    #[schema(example = "/admin/news/42")]
    pub leaving: String,
    /// Location the back/forward action moved to.
    #[schema(example = "/admin/news")]
    pub destination: String,
    /// The user's answer to the leave prompt. Ignored when the form is clean.
    #[serde(default)]
    pub confirmed: bool,
}

/// Check that a client-supplied location is an absolute in-app path.
pub fn validate_location(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if !value.starts_with('/') {
        return Err(AppError::Validation(format!("{field} must start with '/'")));
    }
    if value.chars().any(char::is_control) {
        return Err(AppError::Validation(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored object.
    pub url: String,
    pub session: SessionView,
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    pub report: CleanupSummary,
    pub session: SessionView,
}

#[derive(Serialize, ToSchema)]
pub struct NavigateResponse {
    /// `navigated` or `confirmation_required`.
    #[schema(example = "confirmation_required")]
    pub outcome: &'static str,
    #[schema(example = "/admin/news")]
    pub target: String,
    pub session: SessionView,
}

impl NavigateResponse {
    pub fn new(outcome: NavigationOutcome, session: SessionView) -> Self {
        let (outcome, target) = match outcome {
            NavigationOutcome::Navigated { target } => ("navigated", target),
            NavigationOutcome::ConfirmationRequired { target } => {
                ("confirmation_required", target)
            }
        };
        Self {
            outcome,
            target,
            session,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmResponse {
    /// Location navigated to.
    pub target: String,
    /// Deletion of the session's uploads, performed before navigating.
    pub report: CleanupSummary,
    pub session: SessionView,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    /// `proceed` or `repinned`.
    #[schema(example = "repinned")]
    pub decision: &'static str,
    /// Location pinned back to when the user declined.
    pub location: Option<String>,
    pub session: SessionView,
}

impl HistoryResponse {
    pub fn new(decision: HistoryDecision, session: SessionView) -> Self {
        let (decision, location) = match decision {
            HistoryDecision::Proceed => ("proceed", None),
            HistoryDecision::Repinned { location } => ("repinned", Some(location)),
        };
        Self {
            decision,
            location,
            session,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CloseResponse {
    pub report: CleanupSummary,
}
