pub mod config;
pub mod errors;

pub use config::{
    ApiConfig, AppConfig, LoggingConfig, ProgressConfig, RetentionConfig, ServerConfig,
    StorageConfig,
};
pub use errors::{Result, SheetTranslatorError};

pub const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

const MAX_JOB_ID_LEN: usize = 128;

/// Reduces an uploaded file name to a single safe path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is removed. Leading dots are stripped so the result can
/// never be hidden or relative.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

pub fn has_spreadsheet_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_JOB_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
