//! Sheet exporter: typed records → positioned cells

use super::binding::{Schema, SheetRecord};
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, CellWrite, ExportCell, ExportRow};
use crate::workbook::{CellStyle, SheetSelector, SheetWrite, Workbook};
use std::fmt;
use tracing::{debug, warn};

/// Produces the style of every cell written to a column.
pub type CellStyleFn<'a> = Box<dyn Fn(u16) -> CellStyle + 'a>;

enum ExportStyle<'a> {
    None,
    Uniform(CellStyle),
    PerColumn(CellStyleFn<'a>),
}

/// A cell the exporter could not write.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCell {
    pub row: u32,
    pub column: u16,
    pub reason: String,
}

/// Outcome of one export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub rows_written: usize,
    pub cells_written: usize,
    /// Per-cell failures; these never abort the export
    pub skipped: Vec<SkippedCell>,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Writes records of a [`SheetRecord`] type below a header area.
pub struct SheetExporter<'a> {
    start_row: u32,
    style: ExportStyle<'a>,
}

impl fmt::Debug for SheetExporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match &self.style {
            ExportStyle::None => "none",
            ExportStyle::Uniform(_) => "uniform",
            ExportStyle::PerColumn(_) => "per-column",
        };
        f.debug_struct("SheetExporter")
            .field("start_row", &self.start_row)
            .field("style", &style)
            .finish()
    }
}

impl<'a> SheetExporter<'a> {
    pub fn new(start_row: u32) -> Self {
        Self {
            start_row,
            style: ExportStyle::None,
        }
    }

    /// Apply one style to every written cell.
    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = ExportStyle::Uniform(style);
        self
    }

    /// Pick the style of each written cell from its column index.
    pub fn with_style_fn<F>(mut self, style: F) -> Self
    where
        F: Fn(u16) -> CellStyle + 'a,
    {
        self.style = ExportStyle::PerColumn(Box::new(style));
        self
    }

    /// Plan the cells for `records`: one row per record, starting at the start row.
    pub fn rows<'r, T, I>(&self, records: I) -> SheetResult<Vec<ExportRow>>
    where
        T: SheetRecord,
        I: IntoIterator<Item = &'r T>,
    {
        let schema = Schema::<T>::resolve()?;
        let mut rows = Vec::new();

        for (offset, record) in records.into_iter().enumerate() {
            let row = u32::try_from(offset)
                .ok()
                .and_then(|offset| self.start_row.checked_add(offset))
                .ok_or_else(|| SheetError::InvalidCell {
                    row: u32::MAX,
                    column: 0,
                    detail: format!("record #{} does not fit below row {}", offset, self.start_row),
                })?;

            let cells = schema
                .bindings()
                .iter()
                .map(|binding| ExportCell {
                    row,
                    column: binding.column(),
                    content: to_write(binding.encode(record)),
                })
                .collect();
            rows.push(ExportRow { row, cells });
        }

        Ok(rows)
    }

    /// Write `records` into `sheet`. Cell-level failures are logged and
    /// reported, and the remaining cells are still written.
    pub fn export<'r, T, I, S>(&self, records: I, sheet: &mut S) -> SheetResult<ExportReport>
    where
        T: SheetRecord,
        I: IntoIterator<Item = &'r T>,
        S: SheetWrite + ?Sized,
    {
        let mut report = ExportReport::default();

        for export_row in self.rows(records)? {
            sheet.create_row(export_row.row)?;
            report.rows_written += 1;

            for cell in export_row.cells {
                let style = self.style_for(cell.column);
                match sheet.write_cell(cell.row, cell.column, cell.content, style.as_ref()) {
                    Ok(()) => report.cells_written += 1,
                    Err(e) => {
                        warn!(row = cell.row, column = cell.column, error = %e, "cell skipped");
                        report.skipped.push(SkippedCell {
                            row: cell.row,
                            column: cell.column,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            sheet = %sheet.name(),
            start_row = self.start_row,
            rows = report.rows_written,
            cells = report.cells_written,
            skipped = report.skipped.len(),
            "records exported"
        );
        Ok(report)
    }

    fn style_for(&self, column: u16) -> Option<CellStyle> {
        match &self.style {
            ExportStyle::None => None,
            ExportStyle::Uniform(style) => Some(style.clone()),
            ExportStyle::PerColumn(style_fn) => Some(style_fn(column)),
        }
    }
}

/// Choose how an encoded field lands in a cell.
///
/// Text starting with `=` is a formula (every leading `=` dropped), a missing
/// value clears the cell, bytes are written as hex text.
fn to_write(value: CellValue) -> CellWrite {
    match value {
        CellValue::String(s) if s.starts_with('=') => {
            CellWrite::Formula(s.trim_start_matches('=').to_string())
        }
        bytes @ CellValue::Bytes(_) => CellWrite::Value(CellValue::String(bytes.to_string())),
        other => CellWrite::Value(other),
    }
}

/// Write `records` into the selected sheet of `template` from `start_row` on
/// and return the filled workbook. `style` picks each cell's style from its
/// column; see [`uniform_style`] for one style everywhere.
pub fn export_rows<'a, T: SheetRecord>(
    records: &[T],
    mut template: Workbook,
    sheet: impl Into<SheetSelector>,
    start_row: u32,
    style: Option<CellStyleFn<'a>>,
) -> SheetResult<Workbook> {
    let mut exporter = SheetExporter::new(start_row);
    if let Some(style) = style {
        exporter.style = ExportStyle::PerColumn(style);
    }

    let index = template.sheet_index(&sheet.into())?;
    let sheet = template
        .sheet_mut(index)
        .ok_or_else(|| SheetError::SheetNotFound(format!("#{}", index)))?;
    exporter.export(records, sheet)?;
    Ok(template)
}

/// A [`CellStyleFn`] giving every column the same style.
pub fn uniform_style(style: CellStyle) -> CellStyleFn<'static> {
    Box::new(move |_| style.clone())
}
