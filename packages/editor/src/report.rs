use common::storage::ObjectStore;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one best-effort deletion pass.
///
/// Each identifier appears in exactly one list. `missing` means the store
/// reported the object as already gone, which is not an error.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<String>,
}

impl CleanupReport {
    /// Number of deletion attempts made.
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.missing.len() + self.failed.len()
    }

    /// True when no attempt failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every identifier once, in sorted order, never propagating errors.
///
/// Failures are logged and collected in [`CleanupReport::failed`]; the
/// objects are left in storage.
pub async fn delete_best_effort(
    store: &dyn ObjectStore,
    identifiers: impl IntoIterator<Item = String>,
) -> CleanupReport {
    let mut identifiers: Vec<String> = identifiers.into_iter().collect();
    identifiers.sort();

    let mut report = CleanupReport::default();
    for url in identifiers {
        match store.delete(&url).await {
            Ok(true) => report.deleted.push(url),
            Ok(false) => report.missing.push(url),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to delete stored object; leaving it orphaned");
                report.failed.push(url);
            }
        }
    }

    if report.attempted() > 0 {
        info!(
            deleted = report.deleted.len(),
            missing = report.missing.len(),
            failed = report.failed.len(),
            "Storage cleanup finished"
        );
    }

    report
}
