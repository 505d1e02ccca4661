//! Error annotator: writes record error text back into the source sheet

use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, CellWrite, Record};
use crate::workbook::{CellStyle, SheetWrite};
use tracing::debug;

/// Header written above the error column when none is given.
pub const DEFAULT_ERROR_HEADER: &str = "Error";

/// Writes each record's error text into a dedicated column of the sheet it
/// was imported from, with a header on the row above the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAnnotator {
    start_row: u32,
    error_column: u16,
    header: String,
    style: Option<CellStyle>,
}

impl ErrorAnnotator {
    pub fn new(start_row: u32, error_column: u16) -> Self {
        Self {
            start_row,
            error_column,
            header: DEFAULT_ERROR_HEADER.to_string(),
            style: None,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Annotate `sheet`; returns the number of record rows written.
    ///
    /// Records are written in ascending row order whatever order the caller
    /// holds them in. Every target row must already exist and every message
    /// must fit in a cell: if any check fails nothing is written.
    pub fn annotate<T, S>(&self, sheet: &mut S, records: &[Record<T>]) -> SheetResult<usize>
    where
        S: SheetWrite + ?Sized,
    {
        let header_row = i64::from(self.start_row) - 1;
        if header_row < 0 || !sheet.has_row(self.start_row - 1) {
            return Err(SheetError::RowNotFound(header_row));
        }

        let mut ordered: Vec<&Record<T>> = records.iter().collect();
        ordered.sort_by_key(|record| record.row_number);

        if let Some(missing) = ordered.iter().find(|record| !sheet.has_row(record.row_number)) {
            return Err(SheetError::RowNotFound(i64::from(missing.row_number)));
        }

        let writes: Vec<(u32, CellWrite)> = std::iter::once((self.start_row - 1, self.header.as_str()))
            .chain(
                ordered
                    .iter()
                    .map(|record| (record.row_number, record.error_message.as_str())),
            )
            .map(|(row, text)| (row, CellWrite::Value(CellValue::from(text))))
            .collect();

        // Nothing is written unless every cell would be accepted
        for (row, content) in &writes {
            sheet.check_write(*row, self.error_column, content)?;
        }

        let style = self.style.as_ref();
        for (row, content) in writes {
            sheet.write_cell(row, self.error_column, content, style)?;
        }

        debug!(
            sheet = %sheet.name(),
            column = self.error_column,
            rows = ordered.len(),
            "error column written"
        );
        Ok(ordered.len())
    }
}

/// Write the error text of `records` into `error_column`, with `header` on the
/// row above `start_row`.
pub fn annotate_errors<T, S>(
    sheet: &mut S,
    records: &[Record<T>],
    start_row: u32,
    error_column: u16,
    header: &str,
) -> SheetResult<()>
where
    S: SheetWrite + ?Sized,
{
    ErrorAnnotator::new(start_row, error_column)
        .with_header(header)
        .annotate(sheet, records)
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{SheetRead, Worksheet};

    fn sheet_with_rows(last: u32) -> Worksheet {
        let mut sheet = Worksheet::new("Data");
        for row in 0..=last {
            sheet.set(row, 0, format!("r{}", row)).unwrap();
        }
        sheet
    }

    fn failed(row: u32, message: &str) -> Record<()> {
        let mut record = Record::new(row, ());
        record.push_error(message);
        record
    }

    #[test]
    fn test_annotate_writes_in_row_order() {
        let mut sheet = sheet_with_rows(8);
        let records = vec![failed(5, "five"), failed(2, "two"), failed(8, "eight")];

        let written = ErrorAnnotator::new(2, 3)
            .with_header("Problems")
            .annotate(&mut sheet, &records)
            .unwrap();

        assert_eq!(written, 3);
        assert_eq!(sheet.cell(1, 3), Some(&CellValue::from("Problems")));
        assert_eq!(sheet.cell(2, 3), Some(&CellValue::from("two")));
        assert_eq!(sheet.cell(5, 3), Some(&CellValue::from("five")));
        assert_eq!(sheet.cell(8, 3), Some(&CellValue::from("eight")));
        assert_eq!(sheet.cell(3, 3), None);
    }

    #[test]
    fn test_default_header() {
        let mut sheet = sheet_with_rows(2);
        annotate_errors(&mut sheet, &[failed(2, "bad")], 1, 1, DEFAULT_ERROR_HEADER).unwrap();
        assert_eq!(sheet.cell(0, 1), Some(&CellValue::from("Error")));
    }

    #[test]
    fn test_missing_row_leaves_sheet_untouched() {
        let mut sheet = sheet_with_rows(4);
        let before = sheet.clone();
        let records = vec![failed(2, "ok"), failed(7, "beyond")];

        let err = ErrorAnnotator::new(1, 2).annotate(&mut sheet, &records).unwrap_err();
        assert!(matches!(err, SheetError::RowNotFound(7)));
        assert_eq!(sheet, before);
    }

    #[test]
    fn test_oversized_message_leaves_sheet_untouched() {
        let mut sheet = sheet_with_rows(4);
        let before = sheet.clone();
        let long = "x".repeat(crate::workbook::MAX_STRING_LEN + 1);
        let records = vec![failed(1, "short"), failed(3, &long)];

        let err = ErrorAnnotator::new(1, 2).annotate(&mut sheet, &records).unwrap_err();
        assert!(matches!(err, SheetError::InvalidCell { row: 3, column: 2, .. }));
        assert_eq!(sheet, before);
        assert_eq!(sheet.cell(0, 2), None);
    }

    #[test]
    fn test_error_column_out_of_range_leaves_sheet_untouched() {
        let mut sheet = sheet_with_rows(2);
        let before = sheet.clone();

        let err = ErrorAnnotator::new(1, crate::workbook::MAX_COLUMN + 1)
            .annotate(&mut sheet, &[failed(1, "x")])
            .unwrap_err();
        assert!(matches!(err, SheetError::InvalidCell { row: 0, .. }));
        assert_eq!(sheet, before);
    }

    #[test]
    fn test_header_row_must_exist() {
        let mut sheet = sheet_with_rows(3);
        let err = ErrorAnnotator::new(0, 2)
            .annotate(&mut sheet, &[failed(1, "x")])
            .unwrap_err();
        assert!(matches!(err, SheetError::RowNotFound(-1)));

        let mut sparse = Worksheet::new("Sparse");
        sparse.set(5, 0, "data").unwrap();
        let err = ErrorAnnotator::new(5, 2)
            .annotate(&mut sparse, &[failed(5, "x")])
            .unwrap_err();
        assert!(matches!(err, SheetError::RowNotFound(4)));
    }

    #[test]
    fn test_style_applies_to_every_written_cell() {
        let mut sheet = sheet_with_rows(2);
        let style = CellStyle::default().with_font_color(0x9C0006);
        ErrorAnnotator::new(1, 4)
            .with_style(style.clone())
            .annotate(&mut sheet, &[failed(1, "x"), failed(2, "y")])
            .unwrap();

        for row in 0..=2 {
            assert_eq!(sheet.get(row, 4).unwrap().style.as_ref(), Some(&style));
        }
    }
}
