use crate::spreadsheet::{read_sheet, write_sheet, TOO_FEW_COLUMNS};
use crate::state::{AppState, HistoryEntry, HistoryStore, JobEvent, JobLog};
use crate::translation::{TranslationOptions, Translator};
use crate::utils::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

/// Everything a worker needs, captured from the upload before the request ends.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub job_id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub options: TranslationOptions,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { artifact: String, rows: usize },
    Rejected(String),
}

/// Drives one job from raw upload bytes to a saved artifact, reporting every
/// step to the job's log. The log receives exactly one terminal event.
pub struct TranslationWorker {
    job: TranslationJob,
    log: Arc<JobLog>,
    translator: Arc<dyn Translator>,
    history: HistoryStore,
    output_dir: PathBuf,
}

impl TranslationWorker {
    pub fn new(state: &AppState, job: TranslationJob, log: Arc<JobLog>) -> Self {
        Self {
            job,
            log,
            translator: state.translator.clone(),
            history: state.history.clone(),
            output_dir: state.config.storage.output_dir.clone(),
        }
    }

    pub async fn run(mut self) {
        let terminal = match self.execute().await {
            Ok(JobOutcome::Completed { artifact, rows }) => {
                info!(artifact = %artifact, rows, "Translation completed");
                JobEvent::success(format!(
                    "Translation completed! {} rows translated. File: {}",
                    rows, artifact
                ))
            }
            Ok(JobOutcome::Rejected(reason)) => {
                warn!(reason = %reason, "Spreadsheet rejected");
                JobEvent::error(reason)
            }
            Err(e) => {
                error!(error = %e, "Translation job failed");
                JobEvent::error(format!("Translation failed: {}", e))
            }
        };

        if let Err(e) = self.log.finish(terminal).await {
            warn!(error = %e, "Could not record terminal event");
        }
    }

    async fn execute(&mut self) -> Result<JobOutcome> {
        let content = std::mem::take(&mut self.job.content);
        let mut sheet = tokio::task::spawn_blocking(move || read_sheet(&content)).await??;

        let Some(source_column) = sheet.source_column() else {
            return Ok(JobOutcome::Rejected(TOO_FEW_COLUMNS.to_string()));
        };

        let rows = sheet.source_rows(source_column);
        let total_rows = rows.len();
        self.log
            .append(JobEvent::info(format!(
                "Starting translation of {} rows...",
                total_rows
            )))
            .await?;

        let mut translated = Vec::with_capacity(total_rows);
        for row in rows {
            let row_number = row.index + 1;
            match row.text {
                None => {
                    self.log
                        .append(JobEvent::info(format!(
                            "Row {}: Empty cell, skipping...",
                            row_number
                        )))
                        .await?;
                    translated.push(String::new());
                }
                Some(text) => {
                    self.log
                        .append(JobEvent::info(format!(
                            "Row {}/{}: Translating...",
                            row_number, total_rows
                        )))
                        .await?;
                    translated.push(self.translate_row(row_number, &text).await?);
                }
            }
        }

        let target_column = sheet.ensure_target_column();
        sheet.set_column(target_column, translated)?;

        let artifact = artifact_name(&self.job.job_id, &self.job.filename);
        let bytes = tokio::task::spawn_blocking(move || write_sheet(&sheet)).await??;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(&artifact), bytes).await?;

        self.history
            .record(HistoryEntry {
                timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                original_file: self.job.filename.clone(),
                translated_file: artifact.clone(),
                source_lang: self.job.options.source_lang.clone(),
                target_lang: self.job.options.target_lang.clone(),
                domain: self.job.options.domain.clone(),
                rows_translated: total_rows,
            })
            .await;

        Ok(JobOutcome::Completed {
            artifact,
            rows: total_rows,
        })
    }

    /// A failed call does not stop the job: the error text becomes the cell.
    async fn translate_row(&self, row: usize, text: &str) -> Result<String> {
        self.log.append(JobEvent::input(text)).await?;

        match self
            .translator
            .translate(&self.job.api_key, text, &self.job.options)
            .await
        {
            Ok(translated) => {
                self.log.append(JobEvent::output(translated.clone())).await?;
                Ok(translated)
            }
            Err(e) => {
                warn!(row, error = %e, "Row translation failed");
                let message = format!("Translation error: {}", e);
                self.log.append(JobEvent::error(message.clone())).await?;
                Ok(message)
            }
        }
    }
}

/// Output name unique per job: `translated_{timestamp}_{job_id}_{stem}.xlsx`.
pub fn artifact_name(job_id: &str, filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("spreadsheet");

    format!(
        "translated_{}_{}_{}.xlsx",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        job_id,
        stem
    )
}

/// Runs the job on the runtime without tying it to the caller. A supervising
/// task ends the log with a terminal error if the worker panics.
pub fn spawn_translation_job(
    state: &AppState,
    job: TranslationJob,
    log: Arc<JobLog>,
) -> JoinHandle<()> {
    let span = info_span!("translation_job", job_id = %job.job_id);
    let worker = TranslationWorker::new(state, job, log.clone());
    let worker_handle = tokio::spawn(worker.run().instrument(span.clone()));

    tokio::spawn(
        async move {
            let Err(e) = worker_handle.await else {
                return;
            };

            error!(error = %e, "Translation worker aborted");
            if log.is_finished().await {
                return;
            }
            if let Err(e) = log
                .finish(JobEvent::error(format!("Translation failed: {}", e)))
                .await
            {
                warn!(error = %e, "Could not record terminal event");
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::{CellValue, Sheet};
    use crate::state::{EventKind, JobStatus};
    use crate::utils::{AppConfig, SheetTranslatorError};
    use async_trait::async_trait;

    struct StubTranslator {
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn translate(
            &self,
            _api_key: &str,
            text: &str,
            options: &TranslationOptions,
        ) -> Result<String> {
            if self.fail_on.iter().any(|f| f == text) {
                return Err(SheetTranslatorError::ApiError("connection reset".to_string()));
            }
            Ok(format!("[{}] {}", options.target_lang, text))
        }
    }

    struct PanickingTranslator;

    #[async_trait]
    impl Translator for PanickingTranslator {
        async fn translate(
            &self,
            _api_key: &str,
            _text: &str,
            _options: &TranslationOptions,
        ) -> Result<String> {
            panic!("translator blew up");
        }
    }

    fn state_with(output_dir: &Path, translator: Arc<dyn Translator>) -> AppState {
        let mut config = AppConfig::default();
        config.storage.output_dir = output_dir.to_path_buf();
        AppState::new(config, translator)
    }

    fn state(output_dir: &Path, fail_on: &[&str]) -> AppState {
        state_with(
            output_dir,
            Arc::new(StubTranslator {
                fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
            }),
        )
    }

    fn workbook(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Vec<u8> {
        let sheet = Sheet::new(
            "Sheet1",
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        );
        write_sheet(&sheet).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn job(id: &str, content: Vec<u8>) -> TranslationJob {
        TranslationJob {
            job_id: id.to_string(),
            filename: "terms.xlsx".to_string(),
            content,
            options: TranslationOptions {
                source_lang: "English".to_string(),
                target_lang: "French".to_string(),
                domain: String::new(),
            },
            api_key: "sk-test".to_string(),
        }
    }

    async fn run_job(state: &AppState, job: TranslationJob) -> Arc<JobLog> {
        let log = state.registry.create(&job.job_id).await.unwrap();
        TranslationWorker::new(state, job, log.clone()).run().await;
        log
    }

    fn read_artifact(dir: &Path) -> Sheet {
        let entry = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .next()
            .expect("artifact written");
        read_sheet(&std::fs::read(entry.path()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn blank_rows_are_skipped_without_calling_translator() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), &[]);
        let content = workbook(
            &["id", "text"],
            vec![
                vec![CellValue::Number(1.0), text("Hello")],
                vec![CellValue::Number(2.0), CellValue::Empty],
                vec![CellValue::Number(3.0), text("World")],
            ],
        );

        let log = run_job(&state, job("scenario-1", content)).await;
        let events = log.snapshot().await;

        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Info,
                EventKind::Info,
                EventKind::Input,
                EventKind::Output,
                EventKind::Info,
                EventKind::Info,
                EventKind::Input,
                EventKind::Output,
                EventKind::Success,
            ]
        );
        assert_eq!(events[0].text, "Starting translation of 3 rows...");
        assert_eq!(events[1].text, "Row 1/3: Translating...");
        assert_eq!(events[2].text, "Hello");
        assert_eq!(events[4].text, "Row 2: Empty cell, skipping...");
        assert!(events.last().unwrap().is_terminal());
        assert_eq!(log.status().await, JobStatus::Succeeded);

        let output = read_artifact(tmp.path());
        assert_eq!(output.headers, vec!["id", "text", "C"]);
        assert_eq!(output.row_count(), 3);
        assert_eq!(output.rows[0][0], CellValue::Number(1.0));
        assert_eq!(output.rows[0][1], text("Hello"));
        assert_eq!(output.rows[0][2], text("[French] Hello"));
        assert_eq!(output.rows[1][2], CellValue::Empty);
        assert_eq!(output.rows[2][2], text("[French] World"));

        let history = state.history.recent_first().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].original_file, "terms.xlsx");
        assert_eq!(history[0].rows_translated, 3);
        assert!(events
            .last()
            .unwrap()
            .text
            .ends_with(&history[0].translated_file));
    }

    #[tokio::test]
    async fn failed_row_keeps_error_text_and_job_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), &["Bad"]);
        let content = workbook(
            &["id", "text"],
            vec![
                vec![CellValue::Number(1.0), text("Good")],
                vec![CellValue::Number(2.0), text("Bad")],
                vec![CellValue::Number(3.0), text("Fine")],
            ],
        );

        let log = run_job(&state, job("scenario-2", content)).await;
        let events = log.snapshot().await;

        let row_errors: Vec<&JobEvent> = events
            .iter()
            .filter(|e| e.kind == EventKind::Error)
            .collect();
        assert_eq!(row_errors.len(), 1);
        assert!(!row_errors[0].is_terminal());
        assert_eq!(
            row_errors[0].text,
            "Translation error: API error: connection reset"
        );

        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Success);
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        let output = read_artifact(tmp.path());
        assert_eq!(
            output.rows[1][2],
            text("Translation error: API error: connection reset")
        );
        assert_eq!(output.rows[2][2], text("[French] Fine"));
    }

    #[tokio::test]
    async fn single_column_sheet_fails_without_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), &[]);
        let content = workbook(&["only"], vec![vec![text("Hello")]]);

        let log = run_job(&state, job("scenario-3", content)).await;
        let events = log.snapshot().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Error);
        assert!(events[0].is_terminal());
        assert_eq!(events[0].text, TOO_FEW_COLUMNS);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert!(state.history.is_empty().await);
    }

    #[tokio::test]
    async fn unreadable_upload_ends_with_single_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), &[]);

        let log = run_job(&state, job("broken", b"not a workbook".to_vec())).await;
        let events = log.snapshot().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].text.starts_with("Translation failed:"));
        assert_eq!(log.status().await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn spawned_job_outlives_caller() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), &[]);
        let content = workbook(&["id", "text"], vec![vec![text("1"), text("Hi")]]);

        let job = job("spawned", content);
        let log = state.registry.create(&job.job_id).await.unwrap();
        let handle = spawn_translation_job(&state, job, log.clone());
        handle.await.unwrap();

        assert!(log.is_finished().await);
    }

    #[tokio::test]
    async fn panicking_worker_still_finishes_job() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state_with(tmp.path(), Arc::new(PanickingTranslator));
        let content = workbook(&["id", "text"], vec![vec![text("1"), text("Hi")]]);

        let job = job("panics", content);
        let log = state.registry.create(&job.job_id).await.unwrap();
        spawn_translation_job(&state, job, log.clone())
            .await
            .unwrap();

        let events = log.snapshot().await;
        let last = events.last().unwrap();
        assert_eq!(log.status().await, JobStatus::Failed);
        assert!(last.is_terminal());
        assert!(last.text.starts_with("Translation failed:"));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(state.history.is_empty().await);
    }

    #[test]
    fn artifact_names_embed_job_and_stem() {
        let name = artifact_name("42", "report.xls");
        assert!(name.starts_with("translated_"));
        assert!(name.ends_with("_42_report.xlsx"));
    }
}
