use crate::state::job_log::{JobEvent, JobLog};
use crate::utils::{Result, SheetTranslatorError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;

/// Process-wide map from job id to its event log.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, Arc<JobLog>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty log. A reused id is rejected, never reset.
    pub async fn create(&self, job_id: &str) -> Result<Arc<JobLog>> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job_id) {
            return Err(SheetTranslatorError::JobAlreadyExists(job_id.to_string()));
        }

        let log = Arc::new(JobLog::new(job_id));
        jobs.insert(job_id.to_string(), log.clone());
        Ok(log)
    }

    pub async fn get(&self, job_id: &str) -> Option<Arc<JobLog>> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn exists(&self, job_id: &str) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    pub async fn append(&self, job_id: &str, event: JobEvent) -> Result<()> {
        let log = self
            .get(job_id)
            .await
            .ok_or_else(|| SheetTranslatorError::JobNotFound(job_id.to_string()))?;
        log.append(event).await
    }

    pub async fn read_from(&self, job_id: &str, offset: usize) -> Result<(Vec<JobEvent>, usize)> {
        let log = self
            .get(job_id)
            .await
            .ok_or_else(|| SheetTranslatorError::JobNotFound(job_id.to_string()))?;
        Ok(log.read_from(offset).await)
    }

    /// Everything recorded so far, or nothing for an unknown id.
    pub async fn snapshot(&self, job_id: &str) -> Vec<JobEvent> {
        match self.get(job_id).await {
            Some(log) => log.snapshot().await,
            None => Vec::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops finished jobs older than `ttl`, then the oldest finished jobs
    /// while more than `max_jobs` finished jobs remain. Running jobs neither
    /// count toward the cap nor get evicted.
    pub async fn evict_finished(&self, ttl: Duration, max_jobs: usize) -> usize {
        let logs: Vec<Arc<JobLog>> = self.jobs.read().await.values().cloned().collect();

        let now = Instant::now();
        let mut finished: Vec<(String, Instant)> = Vec::new();
        for log in logs {
            if let Some(at) = log.finished_at().await {
                finished.push((log.job_id().to_string(), at));
            }
        }
        finished.sort_by_key(|(_, at)| *at);

        let mut jobs = self.jobs.write().await;
        let mut finished_remaining = finished.len();
        let mut evicted = 0;

        for (job_id, finished_at) in finished {
            let expired = now.saturating_duration_since(finished_at) >= ttl;
            if !expired && finished_remaining <= max_jobs {
                continue;
            }
            if jobs.remove(&job_id).is_some() {
                finished_remaining -= 1;
                evicted += 1;
                info!(job_id = %job_id, expired, "Evicted finished job");
            }
        }

        evicted
    }
}
