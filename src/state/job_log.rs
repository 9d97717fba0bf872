use crate::utils::{Result, SheetTranslatorError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::{watch, RwLock};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Input,
    Output,
    Info,
    Error,
    Success,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Input => write!(f, "input"),
            EventKind::Output => write!(f, "output"),
            EventKind::Info => write!(f, "info"),
            EventKind::Error => write!(f, "error"),
            EventKind::Success => write!(f, "success"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub text: String,
    pub timestamp: String,
    #[serde(rename = "final", default)]
    pub terminal: bool,
}

impl JobEvent {
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            terminal: false,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(EventKind::Info, text)
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::new(EventKind::Input, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(EventKind::Output, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(EventKind::Error, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(EventKind::Success, text).into_terminal()
    }

    /// Marks the event as the one that ends its job.
    pub fn into_terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
struct LogInner {
    events: Vec<JobEvent>,
    finished_at: Option<Instant>,
}

/// Append-only event sequence for one job.
///
/// A single worker appends while any number of readers take snapshots or
/// suffixes. Every append bumps a watch channel carrying the event count so
/// readers can wait for growth instead of spinning.
#[derive(Debug)]
pub struct JobLog {
    job_id: String,
    created_at: Instant,
    inner: RwLock<LogInner>,
    len_tx: watch::Sender<usize>,
}

impl JobLog {
    pub fn new(job_id: impl Into<String>) -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            job_id: job_id.into(),
            created_at: Instant::now(),
            inner: RwLock::new(LogInner {
                events: Vec::new(),
                finished_at: None,
            }),
            len_tx,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub async fn append(&self, event: JobEvent) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.finished_at.is_some() {
            return Err(SheetTranslatorError::JobFinished(self.job_id.clone()));
        }

        if event.is_terminal() {
            inner.finished_at = Some(Instant::now());
        }
        inner.events.push(event);

        self.len_tx.send_replace(inner.events.len());
        Ok(())
    }

    /// Appends the terminal event. Only `success` and `error` may end a job.
    pub async fn finish(&self, event: JobEvent) -> Result<()> {
        match event.kind {
            EventKind::Success | EventKind::Error => self.append(event.into_terminal()).await,
            other => Err(SheetTranslatorError::validation(format!(
                "A job cannot finish with a {} event",
                other
            ))),
        }
    }

    /// Events at or after `offset`, plus the offset to resume from.
    pub async fn read_from(&self, offset: usize) -> (Vec<JobEvent>, usize) {
        let inner = self.inner.read().await;
        let start = offset.min(inner.events.len());
        (inner.events[start..].to_vec(), inner.events.len())
    }

    pub async fn snapshot(&self) -> Vec<JobEvent> {
        self.inner.read().await.events.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn finished_at(&self) -> Option<Instant> {
        self.inner.read().await.finished_at
    }

    pub async fn is_finished(&self) -> bool {
        self.finished_at().await.is_some()
    }

    pub async fn status(&self) -> JobStatus {
        let inner = self.inner.read().await;
        match inner.events.last() {
            None => JobStatus::Pending,
            Some(event) if event.is_terminal() && event.kind == EventKind::Success => {
                JobStatus::Succeeded
            }
            Some(event) if event.is_terminal() => JobStatus::Failed,
            Some(_) => JobStatus::Running,
        }
    }

    /// Receiver that observes the event count after every append.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_keep_append_order() {
        let log = JobLog::new("job-1");
        log.append(JobEvent::info("one")).await.unwrap();
        log.append(JobEvent::input("two")).await.unwrap();
        log.append(JobEvent::output("three")).await.unwrap();

        let texts: Vec<String> = log.snapshot().await.into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(log.status().await, JobStatus::Running);
    }

    #[tokio::test]
    async fn nothing_is_appended_after_terminal_event() {
        let log = JobLog::new("job-2");
        log.append(JobEvent::info("start")).await.unwrap();
        log.finish(JobEvent::success("done")).await.unwrap();

        let err = log.append(JobEvent::info("late")).await.unwrap_err();
        assert!(matches!(err, SheetTranslatorError::JobFinished(_)));
        assert!(log.finish(JobEvent::error("again")).await.is_err());

        let events = log.snapshot().await;
        assert_eq!(events.len(), 2);
        assert!(events.last().unwrap().is_terminal());
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(log.status().await, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn row_errors_do_not_finish_the_job() {
        let log = JobLog::new("job-3");
        log.append(JobEvent::error("Translation error: timeout"))
            .await
            .unwrap();
        assert!(!log.is_finished().await);
        assert_eq!(log.status().await, JobStatus::Running);

        log.finish(JobEvent::error("Translation failed: disk full"))
            .await
            .unwrap();
        assert_eq!(log.status().await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn finish_rejects_non_terminal_kinds() {
        let log = JobLog::new("job-4");
        assert!(log.finish(JobEvent::info("nope")).await.is_err());
        assert!(log.is_empty().await);
        assert_eq!(log.status().await, JobStatus::Pending);
    }

    #[tokio::test]
    async fn read_from_returns_suffix_and_new_offset() {
        let log = JobLog::new("job-5");
        for i in 0..4 {
            log.append(JobEvent::info(format!("e{}", i))).await.unwrap();
        }

        let (events, offset) = log.read_from(1).await;
        assert_eq!(offset, 4);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].text, "e1");

        let (events, offset) = log.read_from(10).await;
        assert!(events.is_empty());
        assert_eq!(offset, 4);
    }

    #[tokio::test]
    async fn subscribers_see_event_count() {
        let log = JobLog::new("job-6");
        let mut rx = log.subscribe();
        log.append(JobEvent::info("a")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }

    #[test]
    fn events_serialize_with_wire_field_names() {
        let event = JobEvent::success("ok");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["text"], "ok");
        assert_eq!(json["final"], true);
        assert_eq!(json["timestamp"].as_str().unwrap().len(), 8);
    }
}
