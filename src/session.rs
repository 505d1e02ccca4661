//! Import sessions: one owned workbook, a selected sheet and the layout of
//! the last import, so that errors can be written back without repeating it.

use crate::error::{SheetError, SheetResult};
use crate::mapping::{ErrorAnnotator, ImportContext, SheetImporter, SheetRecord};
use crate::types::{RawRow, Record};
use crate::workbook::{CellStyle, SheetSelector, Workbook, Worksheet};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    start_row: u32,
    error_column: u16,
}

/// Owns a workbook for the duration of an import/annotate cycle.
///
/// `C` is caller context made available to validation hooks through
/// [`ImportContext::extra`].
#[derive(Debug)]
pub struct ImportSession<C = ()> {
    workbook: Workbook,
    current: Option<usize>,
    layout: Option<Layout>,
    raw_rows: Vec<RawRow>,
    extra: C,
    error_style: Option<CellStyle>,
}

impl ImportSession<()> {
    pub fn new(workbook: Workbook) -> Self {
        Self {
            workbook,
            current: None,
            layout: None,
            raw_rows: Vec::new(),
            extra: (),
            error_style: None,
        }
    }

    /// Load a workbook file; the file is closed before this returns.
    pub fn open<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        Ok(Self::new(Workbook::open(path)?))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> SheetResult<Self> {
        Ok(Self::new(Workbook::from_bytes(bytes)?))
    }
}

impl<C> ImportSession<C> {
    /// Attach typed context for validation hooks and business steps.
    pub fn with_context<D>(self, extra: D) -> ImportSession<D> {
        ImportSession {
            workbook: self.workbook,
            current: self.current,
            layout: self.layout,
            raw_rows: self.raw_rows,
            extra,
            error_style: self.error_style,
        }
    }

    /// Style applied to the header and every cell of the error column.
    pub fn with_error_style(mut self, style: CellStyle) -> Self {
        self.error_style = Some(style);
        self
    }

    pub fn context(&self) -> &C {
        &self.extra
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.extra
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    /// Make `selector` the current sheet.
    pub fn select_sheet(&mut self, selector: impl Into<SheetSelector>) -> SheetResult<&Worksheet> {
        let index = self.workbook.sheet_index(&selector.into())?;
        if self.current != Some(index) {
            self.layout = None;
            self.raw_rows.clear();
        }
        self.current = Some(index);
        self.current_sheet()
    }

    pub fn current_sheet(&self) -> SheetResult<&Worksheet> {
        self.current
            .and_then(|index| self.workbook.sheet(index))
            .ok_or(SheetError::UninitializedSource)
    }

    pub fn current_sheet_mut(&mut self) -> SheetResult<&mut Worksheet> {
        match self.current {
            Some(index) => self
                .workbook
                .sheet_mut(index)
                .ok_or(SheetError::UninitializedSource),
            None => Err(SheetError::UninitializedSource),
        }
    }

    /// Data start row of the last import.
    pub fn start_row(&self) -> Option<u32> {
        self.layout.map(|layout| layout.start_row)
    }

    /// Error column of the last import.
    pub fn error_column(&self) -> Option<u16> {
        self.layout.map(|layout| layout.error_column)
    }

    /// Raw rows retained by the last import.
    pub fn raw_rows(&self) -> &[RawRow] {
        &self.raw_rows
    }

    /// Select a sheet and import it.
    pub fn import<T: SheetRecord>(
        &mut self,
        selector: impl Into<SheetSelector>,
        start_row: u32,
        error_column: u16,
    ) -> SheetResult<Vec<Record<T>>> {
        self.import_with_hook(selector, start_row, error_column, |record, _| record)
    }

    /// Select a sheet and import it, running `hook` on every decoded row.
    pub fn import_with_hook<T, F>(
        &mut self,
        selector: impl Into<SheetSelector>,
        start_row: u32,
        error_column: u16,
        hook: F,
    ) -> SheetResult<Vec<Record<T>>>
    where
        T: SheetRecord,
        F: for<'c> FnMut(Record<T>, &ImportContext<'c, C>) -> Record<T>,
    {
        self.select_sheet(selector)?;
        self.import_selected(start_row, error_column, hook)
    }

    /// Import the current sheet; fails with [`SheetError::UninitializedSource`]
    /// when no sheet has been selected.
    pub fn import_selected<T, F>(
        &mut self,
        start_row: u32,
        error_column: u16,
        hook: F,
    ) -> SheetResult<Vec<Record<T>>>
    where
        T: SheetRecord,
        F: for<'c> FnMut(Record<T>, &ImportContext<'c, C>) -> Record<T>,
    {
        let index = self.current.ok_or(SheetError::UninitializedSource)?;
        let sheet = self
            .workbook
            .sheet(index)
            .ok_or(SheetError::UninitializedSource)?;

        let importer = SheetImporter::new(start_row, error_column);
        let (records, context) = importer.import_with(sheet, &self.extra, hook)?;
        let raw_rows = context.into_raw_rows();

        self.raw_rows = raw_rows;
        self.layout = Some(Layout {
            start_row,
            error_column,
        });
        Ok(records)
    }

    /// Import, then hand the records and the session to a business step.
    pub fn run<T, F, B, R>(
        &mut self,
        selector: impl Into<SheetSelector>,
        start_row: u32,
        error_column: u16,
        hook: F,
        business: B,
    ) -> SheetResult<R>
    where
        T: SheetRecord,
        F: for<'c> FnMut(Record<T>, &ImportContext<'c, C>) -> Record<T>,
        B: FnOnce(Vec<Record<T>>, &mut Self) -> R,
    {
        let records = self.import_with_hook(selector, start_row, error_column, hook)?;
        Ok(business(records, self))
    }

    /// Write the error text of `records` into the current sheet, using the
    /// layout of the last import.
    pub fn write_errors<T>(&mut self, records: &[Record<T>], header: &str) -> SheetResult<usize> {
        let layout = self.layout.ok_or(SheetError::UninitializedSource)?;

        let mut annotator =
            ErrorAnnotator::new(layout.start_row, layout.error_column).with_header(header);
        if let Some(style) = &self.error_style {
            annotator = annotator.with_style(style.clone());
        }

        let sheet = self.current_sheet_mut()?;
        annotator.annotate(sheet, records)
    }

    /// [`write_errors`](Self::write_errors), then save the workbook to `path`.
    pub fn write_error_file<T, P: AsRef<Path>>(
        &mut self,
        records: &[Record<T>],
        path: P,
        header: &str,
    ) -> SheetResult<()> {
        let written = self.write_errors(records, header)?;
        self.workbook.save(path.as_ref())?;
        debug!(path = %path.as_ref().display(), rows = written, "error file written");
        Ok(())
    }

    /// [`write_errors`](Self::write_errors), then serialize the workbook.
    pub fn error_bytes<T>(&mut self, records: &[Record<T>], header: &str) -> SheetResult<Vec<u8>> {
        self.write_errors(records, header)?;
        self.workbook.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Binding;
    use crate::types::CellValue;
    use crate::workbook::SheetRead;

    #[derive(Debug, Default)]
    struct Row {
        name: String,
        qty: i32,
    }

    impl SheetRecord for Row {
        fn columns() -> Vec<Binding<Self>> {
            vec![crate::bind!(Row, 0 => name), crate::bind!(Row, 1 => qty)]
        }
    }

    fn session() -> ImportSession {
        let mut book = Workbook::new();
        book.add_sheet("Cover");
        let sheet = book.add_sheet("Orders");
        sheet.set(0, 0, "Name").unwrap();
        sheet.set(0, 1, "Qty").unwrap();
        sheet.set(1, 0, "pen").unwrap();
        sheet.set(1, 1, 2.0).unwrap();
        sheet.set(2, 0, "ink").unwrap();
        sheet.set(2, 1, "many").unwrap();
        ImportSession::new(book)
    }

    #[test]
    fn test_nothing_selected_is_uninitialized() {
        let mut session = session();
        assert!(matches!(
            session.current_sheet(),
            Err(SheetError::UninitializedSource)
        ));
        assert!(matches!(
            session.import_selected::<Row, _>(1, 2, |record, _| record),
            Err(SheetError::UninitializedSource)
        ));
        assert!(matches!(
            session.write_errors::<Row>(&[], "Error"),
            Err(SheetError::UninitializedSource)
        ));
    }

    #[test]
    fn test_import_by_name_remembers_layout() {
        let mut session = session();
        let records = session.import::<Row>("Orders", 1, 2).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(session.current_sheet().unwrap().name(), "Orders");
        assert_eq!(session.start_row(), Some(1));
        assert_eq!(session.error_column(), Some(2));
        assert_eq!(session.raw_rows().len(), 2);
    }

    #[test]
    fn test_unknown_sheet() {
        let mut session = session();
        assert!(matches!(
            session.import::<Row>("Missing", 1, 2),
            Err(SheetError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_run_with_context_and_business_step() {
        let mut session = session().with_context(1i32);

        let failed = session
            .run(
                1usize,
                1,
                2,
                |mut record: Record<Row>, ctx| {
                    if record.qty > *ctx.extra() {
                        record.push_error("qty over limit");
                    }
                    record
                },
                |records, session| {
                    let failed: Vec<Record<Row>> =
                        records.into_iter().filter(|r| r.has_error()).collect();
                    session.write_errors(&failed, "Error").unwrap();
                    failed.len()
                },
            )
            .unwrap();

        assert_eq!(failed, 2);
        let sheet = session.current_sheet().unwrap();
        assert_eq!(sheet.cell(0, 2), Some(&CellValue::from("Error")));
        assert_eq!(sheet.cell(1, 2), Some(&CellValue::from("qty over limit")));
        assert!(sheet
            .cell(2, 2)
            .unwrap()
            .to_string()
            .starts_with("invalid value at col 1:"));
    }

    #[test]
    fn test_error_bytes_reload() {
        let mut session = session();
        let records = session.import::<Row>(1usize, 1, 2).unwrap();
        let bytes = session.error_bytes(&records, "Why").unwrap();

        let reloaded = Workbook::from_bytes(bytes).unwrap();
        let orders = reloaded.sheet_by_name("Orders").unwrap();
        assert_eq!(orders.cell(0, 2), Some(&CellValue::from("Why")));
    }
}
