//! Read-all sheet snapshots
//!
//! A snapshot is the raw, untyped content of a sheet: every non-empty row
//! with its cells from the first to the last stored column. Snapshots derive
//! `Serialize` so the CLI can dump them as JSON or YAML.

use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, ValueType};
use crate::workbook::{SheetRead, Workbook, Worksheet};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotColumn {
    pub column_index: u16,
    pub value_type: ValueType,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub row_index: u32,
    pub columns: Vec<SnapshotColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSnapshot {
    pub sheet_index: usize,
    pub sheet_name: String,
    pub rows: Vec<SnapshotRow>,
}

/// Snapshot one worksheet, tagging it with `index`.
pub fn snapshot_worksheet(sheet: &Worksheet, index: usize) -> SheetSnapshot {
    let mut rows = Vec::new();

    for (row_index, _) in sheet.rows() {
        let Some((first, last)) = sheet.column_bounds(row_index) else {
            continue;
        };

        let columns: Vec<SnapshotColumn> = (first..=last)
            .map(|column_index| {
                let value = sheet.cell(row_index, column_index).cloned().unwrap_or_default();
                SnapshotColumn {
                    column_index,
                    value_type: value.value_type(),
                    value,
                }
            })
            .collect();

        if columns.iter().all(|column| column.value.is_none()) {
            continue;
        }
        rows.push(SnapshotRow { row_index, columns });
    }

    SheetSnapshot {
        sheet_index: index,
        sheet_name: sheet.name().to_string(),
        rows,
    }
}

/// Snapshot the sheet at `index` of `workbook`.
pub fn snapshot_sheet(workbook: &Workbook, index: usize) -> SheetResult<SheetSnapshot> {
    let sheet = workbook
        .sheet(index)
        .ok_or_else(|| SheetError::SheetNotFound(format!("#{}", index)))?;
    Ok(snapshot_worksheet(sheet, index))
}

impl Workbook {
    /// Snapshots of every sheet, in workbook order.
    pub fn snapshot_all(&self) -> Vec<SheetSnapshot> {
        self.sheets()
            .iter()
            .enumerate()
            .map(|(index, sheet)| snapshot_worksheet(sheet, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::SheetWrite;
    use pretty_assertions::assert_eq;

    fn sample() -> Workbook {
        let mut book = Workbook::new();
        let sheet = book.add_sheet("Data");
        sheet.set(0, 1, "Name").unwrap();
        sheet.set(0, 3, "Age").unwrap();
        sheet.create_row(1).unwrap();
        sheet.set(2, 1, "Nancy").unwrap();
        sheet.set(2, 3, 13.0).unwrap();
        book.add_sheet("Empty");
        book
    }

    #[test]
    fn test_snapshot_fills_gaps_and_skips_blank_rows() {
        let snapshot = snapshot_sheet(&sample(), 0).unwrap();

        assert_eq!(snapshot.sheet_name, "Data");
        let rows: Vec<u32> = snapshot.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(rows, vec![0, 2]);

        let types: Vec<ValueType> = snapshot.rows[1]
            .columns
            .iter()
            .map(|c| c.value_type)
            .collect();
        assert_eq!(
            types,
            vec![ValueType::String, ValueType::None, ValueType::Numeric]
        );
        assert_eq!(snapshot.rows[1].columns[0].column_index, 1);
    }

    #[test]
    fn test_snapshot_missing_sheet() {
        assert!(matches!(
            snapshot_sheet(&sample(), 7),
            Err(SheetError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_all_and_json_shape() {
        let all = sample().snapshot_all();
        assert_eq!(all.len(), 2);
        assert!(all[1].rows.is_empty());

        let json = serde_json::to_value(&all[0]).unwrap();
        assert_eq!(json["rows"][1]["columns"][2]["value"], serde_json::json!(13.0));
        assert_eq!(json["rows"][1]["columns"][1]["value_type"], "none");
        assert!(json["rows"][1]["columns"][1]["value"].is_null());
    }
}
