use crate::spreadsheet::{preview_source_column, read_sheet, PREVIEW_ROW_LIMIT, XLSX_CONTENT_TYPE};
use crate::state::AppState;
use crate::translation::{spawn_translation_job, TranslationJob, TranslationOptions};
use crate::utils::{
    has_spreadsheet_extension, is_valid_job_id, secure_filename, SheetTranslatorError,
};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_SOURCE_LANG: &str = "auto";
const DEFAULT_TARGET_LANG: &str = "English";

/// JSON error body `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<SheetTranslatorError> for ApiError {
    fn from(err: SheetTranslatorError) -> Self {
        let status = match &err {
            SheetTranslatorError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SheetTranslatorError::JobAlreadyExists(_) => StatusCode::CONFLICT,
            SheetTranslatorError::JobNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed, non-empty text field.
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The uploaded spreadsheet with a sanitized name and a checked extension.
    fn take_spreadsheet(&mut self) -> Result<UploadedFile, ApiError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

        if file.filename.is_empty() {
            return Err(ApiError::bad_request("No file selected"));
        }
        if !has_spreadsheet_extension(&file.filename) {
            return Err(ApiError::bad_request(
                "Please upload an Excel file (.xlsx or .xls)",
            ));
        }

        let filename = match secure_filename(&file.filename) {
            name if name.is_empty() => "upload.xlsx".to_string(),
            name => name,
        };

        Ok(UploadedFile {
            filename,
            bytes: file.bytes,
        })
    }
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = UploadForm::read(&mut multipart).await?;
    let file = form.take_spreadsheet()?;

    let api_key = form
        .field("api_key")
        .ok_or_else(|| ApiError::bad_request("API key is required"))?
        .to_string();

    if file.bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }

    let job_id = match form.field("session_id") {
        Some(id) if is_valid_job_id(id) => id.to_string(),
        Some(id) => {
            return Err(ApiError::bad_request(format!(
                "Invalid session_id '{}': use 1-128 letters, digits, '-' or '_'",
                id
            )))
        }
        None => Uuid::new_v4().to_string(),
    };

    let options = TranslationOptions {
        source_lang: form
            .field("source_lang")
            .unwrap_or(DEFAULT_SOURCE_LANG)
            .to_string(),
        target_lang: form
            .field("target_lang")
            .or_else(|| form.field("target_lang_1"))
            .unwrap_or(DEFAULT_TARGET_LANG)
            .to_string(),
        domain: form.field("domain").unwrap_or_default().to_string(),
    };

    let log = state.registry.create(&job_id).await?;

    info!(
        job_id = %job_id,
        filename = %file.filename,
        bytes = file.bytes.len(),
        source_lang = %options.source_lang,
        target_lang = %options.target_lang,
        "Translation job submitted"
    );

    spawn_translation_job(
        &state,
        TranslationJob {
            job_id: job_id.clone(),
            filename: file.filename,
            content: file.bytes,
            options,
            api_key,
        },
        log,
    );

    Ok(Json(json!({
        "success": true,
        "session_id": job_id,
        "message": "Translation started"
    })))
}

pub async fn session_messages(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(state.registry.snapshot(&job_id).await)
}

pub async fn preview_excel(mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut form = UploadForm::read(&mut multipart).await?;
    let file = form.take_spreadsheet()?;

    let bytes = file.bytes;
    let sheet = tokio::task::spawn_blocking(move || read_sheet(&bytes))
        .await
        .map_err(SheetTranslatorError::from)?
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to preview file: {}", e),
            )
        })?;

    let preview = preview_source_column(&sheet, PREVIEW_ROW_LIMIT)?;

    Ok(Json(json!({
        "success": true,
        "filename": file.filename,
        "total_rows": preview.total_rows,
        "content": preview.content,
    })))
}

pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if filename.is_empty() || secure_filename(&filename) != filename {
        warn!(filename = %filename, "Rejected download name");
        return Err(ApiError::bad_request("Invalid file name"));
    }

    let path = state.config.storage.output_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("File not found: {}", filename)))
        }
        Err(e) => return Err(SheetTranslatorError::from(e).into()),
    };

    let content_type = if filename.to_ascii_lowercase().ends_with(".xlsx") {
        XLSX_CONTENT_TYPE
    } else {
        "application/octet-stream"
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.history.recent_first().await)
}

pub async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    state.history.clear().await;
    Json(json!({ "success": true }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.config.server.name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        let cases = [
            (
                SheetTranslatorError::validation("bad"),
                StatusCode::BAD_REQUEST,
            ),
            (
                SheetTranslatorError::JobAlreadyExists("a".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                SheetTranslatorError::JobNotFound("a".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                SheetTranslatorError::ApiError("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = ApiError::from(SheetTranslatorError::validation("API key is required"));
        assert_eq!(err.message, "API key is required");
    }
}
