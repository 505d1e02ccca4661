//! Sheet importer: drives the row decoder over a data range

use super::annotator::ErrorAnnotator;
use super::binding::{Schema, SheetRecord};
use super::decoder::RowDecoder;
use crate::error::{SheetError, SheetResult};
use crate::types::{RawRow, Record};
use crate::workbook::SheetRead;
use tracing::{debug, warn};

/// State of one import, handed to validation hooks and returned to the caller.
#[derive(Debug, Clone)]
pub struct ImportContext<'a, C = ()> {
    pub sheet_name: String,
    /// First data row (0-based)
    pub start_row: u32,
    /// Column that receives error text on annotation
    pub error_column: u16,
    pub last_row: Option<u32>,
    raw_rows: Vec<RawRow>,
    extra: &'a C,
}

impl<'a, C> ImportContext<'a, C> {
    fn new<S: SheetRead + ?Sized>(sheet: &S, start_row: u32, error_column: u16, extra: &'a C) -> Self {
        Self {
            sheet_name: sheet.name().to_string(),
            start_row,
            error_column,
            last_row: sheet.last_row(),
            raw_rows: Vec::new(),
            extra,
        }
    }

    /// Raw values of every non-empty row read so far, in sheet order.
    pub fn raw_rows(&self) -> &[RawRow] {
        &self.raw_rows
    }

    pub fn raw_row(&self, row: u32) -> Option<&RawRow> {
        self.raw_rows
            .binary_search_by_key(&row, |raw| raw.row)
            .ok()
            .map(|index| &self.raw_rows[index])
    }

    /// Caller-supplied context for hooks.
    pub fn extra(&self) -> &'a C {
        self.extra
    }

    /// An annotator laid out for this import's header row and error column.
    pub fn annotator(&self) -> ErrorAnnotator {
        ErrorAnnotator::new(self.start_row, self.error_column)
    }

    pub fn into_raw_rows(self) -> Vec<RawRow> {
        self.raw_rows
    }
}

/// Imports typed records from a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetImporter {
    start_row: u32,
    error_column: u16,
}

impl SheetImporter {
    pub fn new(start_row: u32, error_column: u16) -> Self {
        Self {
            start_row,
            error_column,
        }
    }

    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    pub fn error_column(&self) -> u16 {
        self.error_column
    }

    /// Import every non-empty row from the start row to the last row.
    pub fn import<T, S>(&self, sheet: &S) -> SheetResult<(Vec<Record<T>>, ImportContext<'static, ()>)>
    where
        T: SheetRecord,
        S: SheetRead + ?Sized,
    {
        self.import_with(sheet, &(), |record, _| record)
    }

    /// Import with a per-row validation hook.
    ///
    /// The hook sees each decoded record together with the import context and
    /// returns the record to keep. It may append errors but cannot drop the
    /// decode errors already on the record or move it to another row.
    pub fn import_with<'c, T, S, C, F>(
        &self,
        sheet: &S,
        extra: &'c C,
        mut hook: F,
    ) -> SheetResult<(Vec<Record<T>>, ImportContext<'c, C>)>
    where
        T: SheetRecord,
        S: SheetRead + ?Sized,
        F: FnMut(Record<T>, &ImportContext<'c, C>) -> Record<T>,
    {
        let row_count = sheet.row_count();
        if self.start_row > row_count {
            return Err(SheetError::Range {
                start_row: self.start_row,
                row_count,
            });
        }

        let schema = Schema::<T>::resolve()?;
        let decoder = RowDecoder::new(&schema);
        let mut context = ImportContext::new(sheet, self.start_row, self.error_column, extra);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        if let Some(last_row) = sheet.last_row() {
            for row in self.start_row..=last_row {
                let raw = decoder.read_row(sheet, row);
                if raw.is_empty() {
                    skipped += 1;
                    continue;
                }

                let record = decoder.decode(&raw);
                context.raw_rows.push(raw);

                let decode_errors = record.error_message.clone();
                let mut checked = hook(record, &context);
                enforce_append_only(&mut checked, row, decode_errors);
                records.push(checked);
            }
        }

        debug!(
            sheet = %context.sheet_name,
            start_row = self.start_row,
            records = records.len(),
            skipped,
            with_errors = records.iter().filter(|r| r.has_error()).count(),
            "sheet imported"
        );

        Ok((records, context))
    }
}

/// Restore the source row and any decode errors a hook tried to discard.
fn enforce_append_only<T>(record: &mut Record<T>, row: u32, decode_errors: String) {
    if record.row_number != row {
        warn!(row, moved_to = record.row_number, "validation hook changed a row number");
        record.row_number = row;
    }
    if !record.error_message.starts_with(&decode_errors) {
        warn!(row, "validation hook rewrote decode errors");
        let appended = std::mem::replace(&mut record.error_message, decode_errors);
        record.push_error(appended);
    }
}

/// Import records of `T` from `sheet`, optionally running `hook` on each row.
pub fn import_rows<T, S>(
    sheet: &S,
    start_row: u32,
    error_column: u16,
    hook: Option<&mut dyn FnMut(Record<T>, &ImportContext<'static, ()>) -> Record<T>>,
) -> SheetResult<(Vec<Record<T>>, ImportContext<'static, ()>)>
where
    T: SheetRecord,
    S: SheetRead + ?Sized,
{
    let importer = SheetImporter::new(start_row, error_column);
    match hook {
        Some(hook) => importer.import_with(sheet, &(), |record, context| hook(record, context)),
        None => importer.import(sheet),
    }
}
