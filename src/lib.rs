pub mod server;
pub mod spreadsheet;
pub mod state;
pub mod translation;
pub mod utils;

pub use server::{router, serve, ApiError};
pub use spreadsheet::{read_sheet, write_sheet, CellValue, Sheet};
pub use state::{AppState, CleanupManager, HistoryStore, JobEvent, JobLog, JobRegistry};
pub use translation::{TranslationClient, TranslationJob, TranslationOptions, Translator};
pub use utils::{AppConfig, Result, SheetTranslatorError};
