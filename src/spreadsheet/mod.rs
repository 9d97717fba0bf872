pub mod preview;
pub mod reader;
pub mod writer;

pub use preview::{
    preview_source_column, PreviewRow, SheetPreview, PREVIEW_ROW_LIMIT, TOO_FEW_COLUMNS,
};
pub use reader::read_sheet;
pub use writer::{write_sheet, XLSX_CONTENT_TYPE};

use chrono::NaiveDate;

pub const SOURCE_HEADER: &str = "B";
pub const TARGET_HEADER: &str = "C";
const SOURCE_POSITION: usize = 1;
const TARGET_POSITION: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date: days since 1899-12-30, time of day as the fraction.
    DateTime(f64),
    /// Elapsed time in days, as stored by `[h]:mm:ss` cells.
    Duration(f64),
}

impl CellValue {
    /// Empty cells and cells holding only whitespace carry nothing to translate.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_)
            | CellValue::Bool(_)
            | CellValue::DateTime(_)
            | CellValue::Duration(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(serial) => excel_datetime_text(*serial),
            CellValue::Duration(days) => duration_text(*days),
        }
    }
}

fn excel_datetime_text(serial: f64) -> String {
    let millis = (serial * 86_400_000.0).round() as i64;
    let datetime = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::milliseconds(millis)));

    match datetime {
        Some(dt) if serial.fract() == 0.0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}

fn duration_text(days: f64) -> String {
    let total = (days * 86_400.0).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

/// One row of the source column handed to the translator.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRow {
    pub index: usize,
    pub text: Option<String>,
}

/// First worksheet of a workbook: a header row plus data rows, every row padded
/// to the header width.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, CellValue::Empty);
                }
                row
            })
            .collect();

        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header_index(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// Column headed `B`, else the second physical column.
    pub fn source_column(&self) -> Option<usize> {
        self.header_index(SOURCE_HEADER).or_else(|| {
            (self.column_count() > SOURCE_POSITION).then_some(SOURCE_POSITION)
        })
    }

    /// Column headed `C`, else the third physical column, else a new column
    /// headed `C` appended at the end.
    pub fn ensure_target_column(&mut self) -> usize {
        if let Some(index) = self.header_index(TARGET_HEADER) {
            return index;
        }
        if self.column_count() > TARGET_POSITION {
            return TARGET_POSITION;
        }

        self.headers.push(TARGET_HEADER.to_string());
        for row in &mut self.rows {
            row.resize(self.headers.len(), CellValue::Empty);
        }
        self.headers.len() - 1
    }

    pub fn source_rows(&self, column: usize) -> Vec<TranslationRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let cell = row.get(column).unwrap_or(&CellValue::Empty);
                TranslationRow {
                    index,
                    text: (!cell.is_blank()).then(|| cell.as_text()),
                }
            })
            .collect()
    }

    pub fn column_cells(&self, column: usize) -> Vec<&CellValue> {
        self.rows
            .iter()
            .map(|row| row.get(column).unwrap_or(&CellValue::Empty))
            .collect()
    }

    /// Overwrites one column; `values` must hold exactly one entry per row.
    pub fn set_column(&mut self, column: usize, values: Vec<String>) -> crate::utils::Result<()> {
        if values.len() != self.rows.len() {
            return Err(crate::utils::SheetTranslatorError::validation(format!(
                "Row count mismatch: expected {}, got {}",
                self.rows.len(),
                values.len()
            )));
        }

        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() <= column {
                row.resize(column + 1, CellValue::Empty);
            }
            row[column] = CellValue::from(value);
        }
        Ok(())
    }
}
