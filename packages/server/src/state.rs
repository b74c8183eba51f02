use std::sync::Arc;

use common::storage::ObjectStore;

use crate::config::AppConfig;
use crate::registry::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub store: Arc<dyn ObjectStore>,
    pub config: AppConfig,
}
