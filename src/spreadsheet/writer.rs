use crate::spreadsheet::{CellValue, Sheet};
use crate::utils::{Result, SheetTranslatorError};
use rust_xlsxwriter::{Format, Workbook};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const MAX_SHEET_NAME_LEN: usize = 31;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// Serializes a sheet into an `.xlsx` workbook buffer. Empty cells are left
/// unwritten so they read back as empty.
pub fn write_sheet(sheet: &Sheet) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let duration_format = Format::new().set_num_format(DURATION_FORMAT);

    let worksheet = workbook.add_worksheet();

    let name: String = sheet.name.chars().take(MAX_SHEET_NAME_LEN).collect();
    if !name.is_empty() {
        worksheet.set_name(name)?;
    }

    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string(0, column_number(col)?, header)?;
    }

    for (row_index, row) in sheet.rows.iter().enumerate() {
        let row_number = u32::try_from(row_index + 1).map_err(|_| {
            SheetTranslatorError::validation("Spreadsheet has too many rows to write")
        })?;

        for (col, cell) in row.iter().enumerate() {
            let col_number = column_number(col)?;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row_number, col_number, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row_number, col_number, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_number, col_number, *b)?;
                }
                CellValue::DateTime(serial) => {
                    let format = if serial.fract() == 0.0 {
                        &date_format
                    } else {
                        &datetime_format
                    };
                    worksheet.write_number_with_format(row_number, col_number, *serial, format)?;
                }
                CellValue::Duration(days) => {
                    worksheet.write_number_with_format(
                        row_number,
                        col_number,
                        *days,
                        &duration_format,
                    )?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col)
        .map_err(|_| SheetTranslatorError::validation("Spreadsheet has too many columns to write"))
}
