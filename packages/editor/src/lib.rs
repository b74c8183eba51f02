//! Edit-session bookkeeping for the admin panel.
//!
//! An edit session owns two trackers: [`uploads::UploadTracker`] remembers
//! which stored images are not yet part of a saved record and which removals
//! are waiting for a save, and [`navigation::UnsavedChangeTracker`] keeps the
//! user from leaving a dirty form without confirming. [`session::EditSession`]
//! ties both to one explicit lifecycle.

pub mod navigation;
pub mod report;
pub mod session;
pub mod uploads;

pub use navigation::{
    HistoryDecision, NavigationOutcome, Navigator, RouteNavigator, UnsavedChangeTracker,
};
pub use report::CleanupReport;
pub use session::EditSession;
pub use uploads::{SessionState, UploadTracker};
