use crate::spreadsheet::{CellValue, Sheet};
use crate::utils::{Result, SheetTranslatorError};
use serde::{Deserialize, Serialize};

pub const PREVIEW_ROW_LIMIT: usize = 50;

pub const TOO_FEW_COLUMNS: &str =
    "Excel file must have at least 2 columns (B column for source text)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPreview {
    pub total_rows: usize,
    pub content: Vec<PreviewRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewRow {
    pub row: usize,
    pub text: String,
    #[serde(rename = "isEmpty")]
    pub is_empty: bool,
}

/// Lists the source column without starting a job. `total_rows` counts the
/// whole column while `content` stops at `limit` rows.
pub fn preview_source_column(sheet: &Sheet, limit: usize) -> Result<SheetPreview> {
    let column = sheet
        .source_column()
        .ok_or_else(|| SheetTranslatorError::validation(TOO_FEW_COLUMNS))?;

    let cells = sheet.column_cells(column);
    let total_rows = cells.len();

    let content = cells
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, cell)| PreviewRow {
            row: i + 1,
            text: cell.as_text(),
            is_empty: matches!(cell, CellValue::Empty),
        })
        .collect();

    Ok(SheetPreview {
        total_rows,
        content,
    })
}
