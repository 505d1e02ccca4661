//! In-memory workbook model and the codec boundary
//!
//! The mapping engine only talks to [`SheetRead`] / [`SheetWrite`]. The concrete
//! [`Workbook`] keeps every sheet in memory:
//! - Load: `.xlsx`/`.xls`/`.ods` → [`Workbook`] via calamine
//! - Save: [`Workbook`] → `.xlsx` via rust_xlsxwriter, or, for a workbook
//!   loaded from `.xlsx`, by patching the edited cells into the source package
//!   with umya-spreadsheet

mod patch;
pub(crate) mod reader;
mod style;
mod writer;

pub use style::{CellFormat, CellStyle, HorizontalAlign, VerticalAlign};

use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, CellWrite};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Last valid 0-based row index in an xlsx worksheet.
pub const MAX_ROW: u32 = 1_048_575;

/// Last valid 0-based column index in an xlsx worksheet.
pub const MAX_COLUMN: u16 = 16_383;

/// Longest string a cell can hold.
pub const MAX_STRING_LEN: usize = 32_767;

//==============================================================================
// Codec boundary
//==============================================================================

/// Read access to one worksheet.
pub trait SheetRead {
    fn name(&self) -> &str;

    /// Highest row index that exists, if any.
    fn last_row(&self) -> Option<u32>;

    fn has_row(&self, row: u32) -> bool;

    /// Stored value at (row, column), `None` when the cell was never created.
    fn cell(&self, row: u32, column: u16) -> Option<&CellValue>;

    /// First and last stored column of a row.
    fn column_bounds(&self, row: u32) -> Option<(u16, u16)>;

    fn row_count(&self) -> u32 {
        self.last_row().map_or(0, |row| row + 1)
    }
}

/// Write access to one worksheet.
pub trait SheetWrite: SheetRead {
    /// Make sure `row` exists, keeping any cells it already has.
    fn create_row(&mut self, row: u32) -> SheetResult<()>;

    /// Check that `write_cell` would accept `content` at this position,
    /// without writing anything.
    fn check_write(&self, row: u32, column: u16, content: &CellWrite) -> SheetResult<()>;

    fn write_cell(
        &mut self,
        row: u32,
        column: u16,
        content: CellWrite,
        style: Option<&CellStyle>,
    ) -> SheetResult<()>;
}

/// Selects a worksheet by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

//==============================================================================
// In-memory model
//==============================================================================

/// One stored cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    /// Formula body without the leading `=`
    pub formula: Option<String>,
    pub style: Option<CellStyle>,
}

/// A worksheet held in memory. Rows exist once created, even when they hold no cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u16, Cell>>,
    /// Cells written since load; only these are patched into a source `.xlsx`
    edited: BTreeSet<(u32, u16)>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            edited: BTreeSet::new(),
        }
    }

    /// Store a literal value, creating the row as needed.
    pub fn set(&mut self, row: u32, column: u16, value: impl Into<CellValue>) -> SheetResult<()> {
        self.write_cell(row, column, CellWrite::Value(value.into()), None)
    }

    /// Store a formula; a leading `=` is accepted and dropped.
    pub fn set_formula(&mut self, row: u32, column: u16, formula: &str) -> SheetResult<()> {
        let body = formula.trim_start_matches('=').to_string();
        self.write_cell(row, column, CellWrite::Formula(body), None)
    }

    pub fn get(&self, row: u32, column: u16) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cells| cells.get(&column))
    }

    /// Rows in ascending order with their cells.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &BTreeMap<u16, Cell>)> {
        self.rows.iter().map(|(row, cells)| (*row, cells))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positions written through [`SheetWrite::write_cell`], in row-major order.
    pub fn edited_cells(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.edited
            .iter()
            .filter_map(|&(row, column)| self.get(row, column).map(|cell| (row, column, cell)))
    }

    pub(crate) fn put_cell(&mut self, row: u32, column: u16, cell: Cell) {
        self.rows.entry(row).or_default().insert(column, cell);
    }

    pub(crate) fn cell_mut(&mut self, row: u32, column: u16) -> &mut Cell {
        self.rows
            .entry(row)
            .or_default()
            .entry(column)
            .or_default()
    }

    fn check_position(row: u32, column: u16) -> SheetResult<()> {
        if row > MAX_ROW {
            return Err(SheetError::InvalidCell {
                row,
                column,
                detail: format!("row exceeds the maximum of {}", MAX_ROW),
            });
        }
        if column > MAX_COLUMN {
            return Err(SheetError::InvalidCell {
                row,
                column,
                detail: format!("column exceeds the maximum of {}", MAX_COLUMN),
            });
        }
        Ok(())
    }
}

impl SheetRead for Worksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    fn has_row(&self, row: u32) -> bool {
        self.rows.contains_key(&row)
    }

    fn cell(&self, row: u32, column: u16) -> Option<&CellValue> {
        self.get(row, column).map(|cell| &cell.value)
    }

    fn column_bounds(&self, row: u32) -> Option<(u16, u16)> {
        let cells = self.rows.get(&row)?;
        let first = cells.keys().next().copied()?;
        let last = cells.keys().next_back().copied()?;
        Some((first, last))
    }
}

impl SheetWrite for Worksheet {
    fn create_row(&mut self, row: u32) -> SheetResult<()> {
        Self::check_position(row, 0)?;
        self.rows.entry(row).or_default();
        Ok(())
    }

    fn check_write(&self, row: u32, column: u16, content: &CellWrite) -> SheetResult<()> {
        Self::check_position(row, column)?;

        let detail = match content {
            CellWrite::Value(CellValue::String(s)) if s.chars().count() > MAX_STRING_LEN => {
                format!("string exceeds {} characters", MAX_STRING_LEN)
            }
            CellWrite::Value(CellValue::Numeric(n)) if !n.is_finite() => {
                format!("{} is not a finite number", n)
            }
            CellWrite::Value(CellValue::Bytes(_)) => {
                "byte sequences cannot be stored in a cell".to_string()
            }
            CellWrite::Formula(body) if body.is_empty() => "empty formula".to_string(),
            _ => return Ok(()),
        };
        Err(SheetError::InvalidCell {
            row,
            column,
            detail,
        })
    }

    fn write_cell(
        &mut self,
        row: u32,
        column: u16,
        content: CellWrite,
        style: Option<&CellStyle>,
    ) -> SheetResult<()> {
        self.check_write(row, column, &content)?;

        let (value, formula) = match content {
            CellWrite::Value(value) => (value, None),
            CellWrite::Formula(body) => (CellValue::None, Some(body)),
        };

        let cell = self.cell_mut(row, column);
        cell.value = value;
        cell.formula = formula;
        if let Some(style) = style {
            cell.style = Some(style.clone());
        }
        self.edited.insert((row, column));
        Ok(())
    }
}

/// Bytes of the `.xlsx` package a workbook was loaded from.
#[derive(Clone, PartialEq)]
pub(crate) struct SourcePackage(Arc<[u8]>);

impl fmt::Debug for SourcePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourcePackage({} bytes)", self.0.len())
    }
}

/// A workbook: an ordered list of in-memory worksheets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    source: Option<SourcePackage>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a workbook file (`.xlsx`, `.xlsm`, `.xls`, `.ods`) fully into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        reader::load_path(path.as_ref())
    }

    /// Read an `.xlsx` workbook from an in-memory stream.
    pub fn from_bytes(bytes: Vec<u8>) -> SheetResult<Self> {
        reader::load_bytes(bytes)
    }

    /// Write the workbook as `.xlsx`, replacing any existing file.
    ///
    /// A workbook loaded from `.xlsx` is saved by patching the cells written
    /// since load into the original package, so its formats, column widths and
    /// merged ranges are kept. Any other workbook is written from its cell
    /// values and styles alone.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SheetResult<()> {
        match &self.source {
            Some(source) => patch::save_path(self, &source.0, path.as_ref()),
            None => writer::save_path(self, path.as_ref()),
        }
    }

    /// Serialize the workbook as `.xlsx` bytes, the same way as [`save`](Self::save).
    pub fn to_bytes(&self) -> SheetResult<Vec<u8>> {
        match &self.source {
            Some(source) => patch::save_buffer(self, &source.0),
            None => writer::save_buffer(self),
        }
    }

    /// Whether saving patches an original `.xlsx` package.
    pub fn keeps_source_layout(&self) -> bool {
        self.source.is_some()
    }

    /// Drop the original package; later saves rebuild the file from cell values.
    pub fn detach_source(&mut self) {
        self.source = None;
    }

    pub(crate) fn set_source(&mut self, bytes: Vec<u8>) {
        self.source = Some(SourcePackage(bytes.into()));
    }

    /// Append a new empty sheet and return it.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Worksheet {
        self.sheets.push(Worksheet::new(name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn push_sheet(&mut self, sheet: Worksheet) {
        self.sheets.push(sheet);
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name()).collect()
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|sheet| sheet.name() == name)
    }

    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name() == name)
    }

    /// Position of the sheet a selector points at.
    pub fn sheet_index(&self, selector: &SheetSelector) -> SheetResult<usize> {
        match selector {
            SheetSelector::Index(index) if *index < self.sheets.len() => Ok(*index),
            SheetSelector::Name(name) => self
                .sheets
                .iter()
                .position(|sheet| sheet.name() == name)
                .ok_or_else(|| SheetError::SheetNotFound(selector.to_string())),
            _ => Err(SheetError::SheetNotFound(selector.to_string())),
        }
    }
}
