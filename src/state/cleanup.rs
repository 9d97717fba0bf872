use crate::state::JobRegistry;
use crate::utils::{AppConfig, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Periodic retention pass over finished jobs and the artifact directory.
pub struct CleanupManager {
    registry: JobRegistry,
    job_ttl: Duration,
    max_jobs: usize,
    max_artifact_bytes: u64,
    output_dir: PathBuf,
}

impl CleanupManager {
    pub fn new(
        registry: JobRegistry,
        job_ttl: Duration,
        max_jobs: usize,
        max_artifact_mb: u64,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            job_ttl,
            max_jobs,
            max_artifact_bytes: max_artifact_mb * 1024 * 1024,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(registry: JobRegistry, config: &AppConfig) -> Self {
        Self::new(
            registry,
            config.job_ttl(),
            config.retention.max_jobs,
            config.retention.max_artifact_mb,
            config.storage.output_dir.clone(),
        )
    }

    pub async fn run_cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport {
            jobs_evicted: self
                .registry
                .evict_finished(self.job_ttl, self.max_jobs)
                .await,
            ..Default::default()
        };

        let output_dir = self.output_dir.clone();
        let budget = self.max_artifact_bytes;
        let (deleted, freed) =
            tokio::task::spawn_blocking(move || trim_artifacts(&output_dir, budget)).await??;
        report.artifacts_deleted = deleted;
        report.bytes_freed = freed;

        info!(
            jobs_evicted = report.jobs_evicted,
            artifacts_deleted = report.artifacts_deleted,
            bytes_freed = report.bytes_freed,
            "Cleanup completed"
        );

        Ok(report)
    }

    pub fn start_background_cleanup(self, cleanup_interval: Duration) {
        tokio::spawn(async move {
            let mut timer = interval(cleanup_interval);

            loop {
                timer.tick().await;

                if let Err(e) = self.run_cleanup().await {
                    warn!(error = %e, "Background cleanup failed");
                }
            }
        });
    }
}

/// Deletes the oldest artifacts until the directory is back under 80% of
/// `max_bytes`. A budget of zero disables trimming.
fn trim_artifacts(dir: &Path, max_bytes: u64) -> Result<(usize, u64)> {
    if max_bytes == 0 || !dir.exists() {
        return Ok((0, 0));
    }

    let mut files_with_info: Vec<(PathBuf, u64, u64)> = Vec::new();
    let mut total_size = 0u64;

    for entry in std::fs::read_dir(dir)?.flatten() {
        if let Ok(metadata) = entry.metadata() {
            if metadata.is_file() {
                let size = metadata.len();
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);

                files_with_info.push((entry.path(), size, modified));
                total_size += size;
            }
        }
    }

    if total_size <= max_bytes {
        return Ok((0, 0));
    }

    files_with_info.sort_by_key(|f| f.2);

    let target_size = max_bytes * 80 / 100;
    let mut deleted = 0;
    let mut freed = 0u64;

    for (path, size, _) in files_with_info {
        if total_size <= target_size {
            break;
        }

        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to delete artifact");
        } else {
            total_size -= size;
            freed += size;
            deleted += 1;
        }
    }

    Ok((deleted, freed))
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub jobs_evicted: usize,
    pub artifacts_deleted: usize,
    pub bytes_freed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobEvent;

    #[tokio::test]
    async fn cleanup_evicts_expired_jobs() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let log = registry.create("old").await.unwrap();
        log.finish(JobEvent::success("ok")).await.unwrap();

        let manager = CleanupManager::new(registry.clone(), Duration::ZERO, 10, 0, tmp.path());
        let report = manager.run_cleanup().await.unwrap();

        assert_eq!(report.jobs_evicted, 1);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn trimming_removes_files_over_budget() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..4 {
            std::fs::write(tmp.path().join(format!("a{}.xlsx", i)), vec![0u8; 400]).unwrap();
        }

        let (deleted, freed) = trim_artifacts(tmp.path(), 1000).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(freed, 800);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn zero_budget_keeps_everything() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.xlsx"), vec![0u8; 10]).unwrap();
        assert_eq!(trim_artifacts(tmp.path(), 0).unwrap(), (0, 0));
    }
}
