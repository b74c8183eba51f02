use std::sync::Arc;
use std::time::Duration;

use common::storage::ObjectStore;
use dashmap::DashMap;
use editor::{CleanupReport, EditSession, RouteNavigator};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<EditSession<RouteNavigator>>>;

/// Open edit sessions of one server instance.
///
/// Each session sits behind its own lock, so requests for one form are
/// serialized while different forms proceed independently.
pub struct SessionRegistry {
    store: Arc<dyn ObjectStore>,
    sessions: DashMap<Uuid, SharedSession>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
        }
    }

    /// Open a session for a form shown at `location`.
    pub fn open(&self, location: &str) -> (Uuid, SharedSession) {
        let session = EditSession::open(Arc::clone(&self.store), RouteNavigator::new(location));
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, Arc::clone(&shared));
        (id, shared)
    }

    pub fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove and close a session, awaiting deletion of its unsaved uploads.
    pub async fn close(&self, id: Uuid) -> Option<CleanupReport> {
        let (_, session) = self.sessions.remove(&id)?;
        let mut session = session.lock().await;
        Some(session.close().await)
    }

    /// Close every session idle for longer than `max_idle`.
    ///
    /// Sessions whose lock is currently held are busy and skipped.
    pub async fn sweep_idle(&self, max_idle: chrono::Duration) -> usize {
        let now = chrono::Utc::now();
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map(|session| session.idle_for(now) > max_idle)
                    .unwrap_or(false)
            })
            .map(|entry| *entry.key())
            .collect();

        let mut closed = 0;
        for id in expired {
            if let Some(report) = self.close(id).await {
                if !report.is_clean() {
                    warn!(
                        session_id = %id,
                        failed = report.failed.len(),
                        "Idle session left orphaned uploads"
                    );
                }
                closed += 1;
            }
        }
        closed
    }

    /// Close every open session. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut closed = 0;
        for id in ids {
            if self.close(id).await.is_some() {
                closed += 1;
            }
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shortest sweep period; a zero period would panic the timer.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn a background task that periodically closes idle sessions.
pub fn spawn_sweeper_task(
    registry: Arc<SessionRegistry>,
    sweep_interval: Duration,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval.max(MIN_SWEEP_INTERVAL));

        loop {
            interval.tick().await;
            let closed = registry.sweep_idle(max_idle).await;
            if closed > 0 {
                info!(closed, remaining = registry.len(), "Closed idle edit sessions");
            }
        }
    })
}
