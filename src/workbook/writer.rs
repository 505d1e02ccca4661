//! Workbook saving - in-memory [`Workbook`] → `.xlsx`

use super::reader::datetime_to_serial;
use super::{Cell, CellFormat, Workbook, Worksheet};
use crate::error::{SheetError, SheetResult};
use crate::types::CellValue;
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet as XlsxWorksheet, XlsxError};
use std::path::Path;
use tracing::debug;

pub(crate) fn save_path(workbook: &Workbook, path: &Path) -> SheetResult<()> {
    let mut xlsx = build(workbook)?;
    xlsx.save(path)
        .map_err(|e| SheetError::Save(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), sheets = workbook.sheet_count(), "workbook saved");
    Ok(())
}

pub(crate) fn save_buffer(workbook: &Workbook) -> SheetResult<Vec<u8>> {
    let mut xlsx = build(workbook)?;
    xlsx.save_to_buffer()
        .map_err(|e| SheetError::Save(e.to_string()))
}

fn build(workbook: &Workbook) -> SheetResult<XlsxWorkbook> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet
            .set_name(sheet.name.as_str())
            .map_err(|e| SheetError::Save(format!("Invalid sheet name '{}': {}", sheet.name, e)))?;
        write_sheet(worksheet, sheet)?;
    }

    Ok(xlsx)
}

fn write_sheet(worksheet: &mut XlsxWorksheet, sheet: &Worksheet) -> SheetResult<()> {
    for (row, cells) in sheet.rows() {
        for (&col, cell) in cells {
            write_cell(worksheet, row, col, cell).map_err(|e| {
                SheetError::Save(format!(
                    "Failed to write cell ({}, {}) of '{}': {}",
                    row, col, sheet.name, e
                ))
            })?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut XlsxWorksheet,
    row: u32,
    col: u16,
    cell: &Cell,
) -> Result<(), XlsxError> {
    let format = cell.style.as_ref().map(|style| style.to_format());

    if let Some(body) = &cell.formula {
        let formula = Formula::new(body.as_str());
        match &format {
            Some(format) => worksheet.write_formula_with_format(row, col, formula, format)?,
            None => worksheet.write_formula(row, col, formula)?,
        };
        return Ok(());
    }

    match (&cell.value, &format) {
        (CellValue::None, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::None, None) => {}
        (CellValue::String(s), Some(format)) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        (CellValue::String(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (CellValue::Numeric(n), Some(format)) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        (CellValue::Numeric(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (CellValue::Boolean(b), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        (CellValue::Boolean(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (CellValue::DateTime(dt), _) => match datetime_to_serial(dt) {
            Some(serial) => {
                let format = date_format(cell);
                worksheet.write_number_with_format(row, col, serial, &format)?;
            }
            // Before the 1900 epoch: keep the text form
            None => {
                worksheet.write_string(row, col, cell.value.to_string())?;
            }
        },
        (CellValue::Bytes(_), _) => {
            worksheet.write_string(row, col, cell.value.to_string())?;
        }
    }
    Ok(())
}

/// Dates need a number format or they read back as plain numbers.
fn date_format(cell: &Cell) -> Format {
    match &cell.style {
        Some(style) if style.number_format.is_some() => style.to_format(),
        Some(style) => style.to_format().set_num_format(CellFormat::DATE_TIME),
        None => Format::new().set_num_format(CellFormat::DATE_TIME),
    }
}
