//! Workbook loading - Excel (.xlsx/.xls/.ods) → in-memory [`Workbook`]

use super::{Cell, Workbook, Worksheet};
use crate::error::{SheetError, SheetResult};
use crate::types::CellValue;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

pub(crate) fn load_path(path: &Path) -> SheetResult<Workbook> {
    let sheets = open_workbook_auto(path)
        .map_err(|e| SheetError::Open(format!("{}: {}", path.display(), e)))?;
    let is_xlsx = matches!(sheets, Sheets::Xlsx(_));
    let mut workbook = load_sheets(sheets)?;

    if is_xlsx {
        let bytes = fs::read(path).map_err(|e| SheetError::Open(format!("{}: {}", path.display(), e)))?;
        workbook.set_source(bytes);
    }

    debug!(
        path = %path.display(),
        sheets = workbook.sheet_count(),
        keeps_layout = is_xlsx,
        "workbook loaded"
    );
    Ok(workbook)
}

pub(crate) fn load_bytes(bytes: Vec<u8>) -> SheetResult<Workbook> {
    let sheets = open_workbook_auto_from_rs(Cursor::new(bytes.as_slice()))
        .map_err(|e| SheetError::Open(e.to_string()))?;
    let is_xlsx = matches!(sheets, Sheets::Xlsx(_));
    let mut workbook = load_sheets(sheets)?;

    if is_xlsx {
        workbook.set_source(bytes);
    }
    Ok(workbook)
}

/// Copy every sheet out of the codec; the reader is dropped when this returns.
fn load_sheets<RS: Read + Seek>(mut sheets: Sheets<RS>) -> SheetResult<Workbook> {
    let mut workbook = Workbook::new();

    let sheet_names = sheets.sheet_names().to_vec();
    for sheet_name in sheet_names {
        let range = sheets
            .worksheet_range(&sheet_name)
            .map_err(|e| SheetError::Open(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;
        // Formulas are optional: not every format exposes them
        let formulas = sheets.worksheet_formula(&sheet_name).ok();

        workbook.push_sheet(convert_sheet(&sheet_name, &range, formulas.as_ref()));
    }

    Ok(workbook)
}

fn convert_sheet(name: &str, range: &Range<Data>, formulas: Option<&Range<String>>) -> Worksheet {
    let mut sheet = Worksheet::new(name);

    // Every row inside the used range exists, even if all its cells are blank
    if let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) {
        for row in first_row..=last_row {
            sheet.rows.entry(row).or_default();
        }
    }

    let (row_offset, col_offset) = range.start().unwrap_or_default();
    for (row, col, data) in range.used_cells() {
        let value = convert_value(data);
        if value.is_none() {
            continue;
        }
        sheet.put_cell(
            row_offset + row as u32,
            (col_offset as usize + col) as u16,
            Cell {
                value,
                ..Cell::default()
            },
        );
    }

    if let Some(formulas) = formulas {
        let (row_offset, col_offset) = formulas.start().unwrap_or_default();
        for (row, col, formula) in formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let cell = sheet.cell_mut(row_offset + row as u32, (col_offset as usize + col) as u16);
            cell.formula = Some(formula.trim_start_matches('=').to_string());
        }
    }

    sheet
}

/// Map a calamine cell onto the closed [`CellValue`] union.
fn convert_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::None,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Float(f) => CellValue::Numeric(*f),
        Data::Int(i) => CellValue::Numeric(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64()) {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Numeric(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(value) => CellValue::DateTime(value),
            Err(_) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(date) => CellValue::DateTime(date.and_time(chrono::NaiveTime::MIN)),
                Err(_) => CellValue::String(s.clone()),
            },
        },
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

/// Convert an Excel serial number (1900 date system) to a date/time.
///
/// Serials below 60 predate Excel's phantom 1900-02-29 and use a one-day-later epoch.
pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.999_999 {
        return None;
    }
    let days = serial.trunc() as i64;
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let millis = (serial.fract() * 86_400_000.0).round() as i64;
    epoch
        .and_time(chrono::NaiveTime::MIN)
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

/// Inverse of [`serial_to_datetime`].
pub(crate) fn datetime_to_serial(value: &NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(chrono::NaiveTime::MIN);
    let delta = *value - epoch;
    let mut serial = delta.num_milliseconds() as f64 / 86_400_000.0;
    if serial < 61.0 {
        // Dates before 1900-03-01 sit one serial lower than a plain day count
        serial -= 1.0;
    }
    (serial >= 0.0).then_some(serial)
}
