//! Read-modify-write saving for workbooks loaded from `.xlsx`
//!
//! The source package is reopened with umya-spreadsheet and only the cells
//! written since load are replaced. Everything calamine does not model
//! (formats, column widths, merged ranges, defined names) stays as it was.

use super::reader::datetime_to_serial;
use super::{Cell, CellFormat, Workbook};
use crate::error::{SheetError, SheetResult};
use crate::types::CellValue;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;
use umya_spreadsheet::{reader, writer, Spreadsheet, Worksheet as UmyaWorksheet};

pub(crate) fn save_path(workbook: &Workbook, source: &[u8], path: &Path) -> SheetResult<()> {
    let book = patch(workbook, source)?;
    writer::xlsx::write(&book, path)
        .map_err(|e| SheetError::Save(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), sheets = workbook.sheet_count(), "source workbook patched");
    Ok(())
}

pub(crate) fn save_buffer(workbook: &Workbook, source: &[u8]) -> SheetResult<Vec<u8>> {
    let book = patch(workbook, source)?;
    let mut buffer = Cursor::new(Vec::new());
    writer::xlsx::write_writer(&book, &mut buffer).map_err(|e| SheetError::Save(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn patch(workbook: &Workbook, source: &[u8]) -> SheetResult<Spreadsheet> {
    let mut book = reader::xlsx::read_reader(Cursor::new(source), true)
        .map_err(|e| SheetError::Save(format!("Failed to reopen source workbook: {}", e)))?;

    for sheet in workbook.sheets() {
        let name = sheet.name.as_str();
        if book.get_sheet_by_name(name).is_none() {
            book.new_sheet(name)
                .map_err(|e| SheetError::Save(format!("Invalid sheet name '{}': {}", name, e)))?;
        }
        let target = book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| SheetError::SheetNotFound(format!("'{}'", name)))?;

        let mut patched = 0usize;
        for (row, column, cell) in sheet.edited_cells() {
            patch_cell(target, row, column, cell);
            patched += 1;
        }
        debug!(sheet = name, cells = patched, "sheet patched");
    }

    Ok(book)
}

fn patch_cell(target: &mut UmyaWorksheet, row: u32, column: u16, cell: &Cell) {
    // umya addresses cells as 1-based (column, row)
    let target_cell = target.get_cell_mut((u32::from(column) + 1, row + 1));

    let mut date_serial = false;
    match (&cell.formula, &cell.value) {
        (Some(body), _) => {
            target_cell.set_formula(body.as_str());
        }
        (None, CellValue::None) => {
            target_cell.set_blank();
        }
        (None, CellValue::String(s)) => {
            target_cell.set_value_string(s.as_str());
        }
        (None, CellValue::Numeric(n)) => {
            target_cell.set_value_number(*n);
        }
        (None, CellValue::Boolean(b)) => {
            target_cell.set_value_bool(*b);
        }
        (None, CellValue::DateTime(dt)) => match datetime_to_serial(dt) {
            Some(serial) => {
                target_cell.set_value_number(serial);
                date_serial = true;
            }
            None => {
                target_cell.set_value_string(cell.value.to_string());
            }
        },
        (None, CellValue::Bytes(_)) => {
            target_cell.set_value_string(cell.value.to_string());
        }
    }

    let style = target_cell.get_style_mut();
    if let Some(cell_style) = &cell.style {
        cell_style.apply_to(style);
    }
    let has_number_format = cell
        .style
        .as_ref()
        .is_some_and(|cell_style| cell_style.number_format.is_some());
    if date_serial && !has_number_format {
        style
            .get_number_format_mut()
            .set_format_code(CellFormat::DATE_TIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellWrite;
    use crate::workbook::{CellStyle, SheetRead, SheetWrite};
    use chrono::NaiveDate;

    fn source_bytes() -> Vec<u8> {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut((1, 1)).set_value_string("Name");
        sheet.get_cell_mut((2, 1)).set_value_string("Total");
        sheet.get_cell_mut((1, 2)).set_value_string("pen");
        sheet.get_cell_mut((2, 2)).set_formula("3*4");
        sheet.add_merge_cells("A5:C5");

        let mut buffer = Cursor::new(Vec::new());
        writer::xlsx::write_writer(&book, &mut buffer).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_loaded_xlsx_keeps_its_source() {
        let book = Workbook::from_bytes(source_bytes()).unwrap();
        assert!(book.keeps_source_layout());
        assert!(!Workbook::new().keeps_source_layout());
    }

    #[test]
    fn test_only_edited_cells_are_patched() {
        let mut book = Workbook::from_bytes(source_bytes()).unwrap();
        let sheet = book.sheet_mut(0).unwrap();
        sheet.set(1, 0, "ink").unwrap();
        sheet
            .set(2, 0, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(sheet.edited_cells().count(), 2);

        let saved = book.to_bytes().unwrap();

        let reloaded = Workbook::from_bytes(saved.clone()).unwrap();
        let sheet = reloaded.sheet(0).unwrap();
        assert_eq!(sheet.cell(0, 0), Some(&CellValue::from("Name")));
        assert_eq!(sheet.cell(1, 0), Some(&CellValue::from("ink")));
        assert!(matches!(sheet.cell(2, 0), Some(CellValue::DateTime(_))));
        assert_eq!(sheet.get(1, 1).unwrap().formula.as_deref(), Some("3*4"));

        let patched = reader::xlsx::read_reader(Cursor::new(saved), true).unwrap();
        let merges = patched.get_sheet_by_name("Sheet1").unwrap().get_merge_cells();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].get_range(), "A5:C5");
    }

    #[test]
    fn test_detached_workbook_is_written_fresh() {
        let mut book = Workbook::from_bytes(source_bytes()).unwrap();
        book.detach_source();
        assert!(!book.keeps_source_layout());

        let saved = book.to_bytes().unwrap();
        let rewritten = reader::xlsx::read_reader(Cursor::new(saved), true).unwrap();
        assert!(rewritten
            .get_sheet_by_name("Sheet1")
            .unwrap()
            .get_merge_cells()
            .is_empty());
    }

    #[test]
    fn test_new_sheet_is_added_to_the_package() {
        let mut book = Workbook::from_bytes(source_bytes()).unwrap();
        let style = CellStyle::default().with_bold(true);
        let extra = book.add_sheet("Errors");
        extra.set(0, 0, "row").unwrap();
        extra
            .write_cell(0, 1, CellWrite::Value("bad".into()), Some(&style))
            .unwrap();

        let reloaded = Workbook::from_bytes(book.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.sheet_names(), vec!["Sheet1", "Errors"]);
        let errors = reloaded.sheet_by_name("Errors").unwrap();
        assert_eq!(errors.cell(0, 1), Some(&CellValue::from("bad")));
    }
}
