use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::job::repository::JobStore;
use crate::pipeline::workspace::WorkspaceManager;

/// Shared application state. The store handles are trait objects so the
/// pipeline's collaborators can be swapped for doubles in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jobs: Arc<dyn JobStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub workspaces: WorkspaceManager,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        jobs: Arc<dyn JobStore>,
        storage: Arc<dyn ObjectStore>,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            config,
            jobs,
            storage,
            workspaces,
        }
    }
}
