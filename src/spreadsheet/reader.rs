use crate::spreadsheet::{CellValue, Sheet};
use crate::utils::{Result, SheetTranslatorError};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// Parses the first worksheet of an `.xlsx` or `.xls` workbook held in memory.
///
/// The first row of the used range becomes the header row. If the used range
/// does not start in column A, the missing leading columns are padded with
/// unnamed headers so positional column lookups stay physical.
pub fn read_sheet(bytes: &[u8]) -> Result<Sheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetTranslatorError::validation("Workbook contains no worksheets"))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let mut rows = range.rows().map(|row| {
        let mut cells = vec![CellValue::Empty; leading_columns];
        cells.extend(row.iter().map(cell_value));
        cells
    });

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                CellValue::Empty => format!("Unnamed: {}", i),
                other => other.as_text(),
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(Sheet::new(sheet_name, headers, rows.collect()))
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Duration(dt.as_f64()),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        other => CellValue::Text(other.to_string()),
    }
}
