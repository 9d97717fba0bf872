use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetTranslatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Job already exists: {0}")]
    JobAlreadyExists(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already finished: {0}")]
    JobFinished(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Translation failed after retries: {0}")]
    TranslationFailed(String),
}

pub type Result<T> = std::result::Result<T, SheetTranslatorError>;

impl SheetTranslatorError {
    pub fn validation(message: impl Into<String>) -> Self {
        SheetTranslatorError::ValidationError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_only_the_message() {
        let err = SheetTranslatorError::validation("API key is required");
        assert_eq!(err.to_string(), "API key is required");
    }

    #[test]
    fn io_errors_convert_with_context() {
        let err: SheetTranslatorError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SheetTranslatorError::IoError(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
