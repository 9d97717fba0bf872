pub mod cleanup;
pub mod history;
pub mod job_log;
pub mod registry;

pub use cleanup::{CleanupManager, CleanupReport};
pub use history::{HistoryEntry, HistoryStore};
pub use job_log::{EventKind, JobEvent, JobLog, JobStatus};
pub use registry::JobRegistry;

use crate::translation::Translator;
use crate::utils::AppConfig;
use std::sync::Arc;

/// Services shared by every request handler and background job. Built once at
/// startup and passed around explicitly.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: JobRegistry,
    pub history: HistoryStore,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub fn new(config: AppConfig, translator: Arc<dyn Translator>) -> Self {
        let history = HistoryStore::new(config.retention.max_history_entries);
        Self {
            config: Arc::new(config),
            registry: JobRegistry::new(),
            history,
            translator,
        }
    }
}
