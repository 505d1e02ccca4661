//! Row decoder: one raw row → one typed record

use super::binding::{Schema, SheetRecord};
use crate::error::SheetError;
use crate::types::{RawRow, Record};
use crate::workbook::SheetRead;

/// Decodes raw rows of a sheet into records of `T`.
pub struct RowDecoder<'s, T> {
    schema: &'s Schema<T>,
}

impl<'s, T: SheetRecord> RowDecoder<'s, T> {
    pub fn new(schema: &'s Schema<T>) -> Self {
        Self { schema }
    }

    /// Collect the raw values of the bound columns of `row`, absent cells as `None`.
    pub fn read_row<S: SheetRead + ?Sized>(&self, sheet: &S, row: u32) -> RawRow {
        let mut raw = RawRow::new(row);
        for column in self.schema.columns() {
            let value = sheet.cell(row, column).cloned().unwrap_or_default();
            raw.push(column, value);
        }
        raw
    }

    /// Decode every bound field; failures are recorded on the record and
    /// decoding carries on with the remaining fields.
    pub fn decode(&self, raw: &RawRow) -> Record<T> {
        let mut record = Record::new(raw.row, T::default());

        for binding in self.schema.bindings() {
            let value = raw.get(binding.column());
            if let Err(detail) = binding.decode(&mut record.data, value) {
                let err = SheetError::Decode {
                    column: binding.column(),
                    detail,
                };
                record.push_error(err.to_string());
            }
        }

        record
    }
}
