use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Separator used when several error messages accumulate on one record.
pub const ERROR_SEPARATOR: &str = ";";

/// Display format for date/time cells rendered as text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NONE_CELL: CellValue = CellValue::None;

//==============================================================================
// Cell values
//==============================================================================

/// Raw value read from (or written to) a single cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Blank or missing cell
    #[default]
    None,
    String(String),
    Boolean(bool),
    Numeric(f64),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

/// Tag of a [`CellValue`], as reported in sheet snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    None,
    String,
    Boolean,
    Numeric,
    DateTime,
    Bytes,
}

impl CellValue {
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }

    /// True for a string cell holding no characters.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, CellValue::String(s) if s.is_empty())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            CellValue::None => ValueType::None,
            CellValue::String(_) => ValueType::String,
            CellValue::Boolean(_) => ValueType::Boolean,
            CellValue::Numeric(_) => ValueType::Numeric,
            CellValue::DateTime(_) => ValueType::DateTime,
            CellValue::Bytes(_) => ValueType::Bytes,
        }
    }
}

/// Natural string form of a cell: integers without a trailing `.0`,
/// dates as `YYYY-MM-DD HH:MM:SS`, bytes as lowercase hex, blanks as "".
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => Ok(()),
            CellValue::String(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Numeric(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            CellValue::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::None => "none",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Numeric => "numeric",
            ValueType::DateTime => "datetime",
            ValueType::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Numeric(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Numeric(value as f64)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Numeric(value as f64)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(value: Vec<u8>) -> Self {
        CellValue::Bytes(value)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// What gets stored into a cell: a literal value or a formula body (no leading `=`).
#[derive(Debug, Clone, PartialEq)]
pub enum CellWrite {
    Value(CellValue),
    Formula(String),
}

//==============================================================================
// Import model
//==============================================================================

/// One raw cell of a [`RawRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub column: u16,
    pub value: CellValue,
}

/// As-read values of one sheet row, restricted to the bound columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 0-based sheet row
    pub row: u32,
    /// Cells in ascending column order
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, column: u16, value: CellValue) {
        self.cells.push(RawCell { column, value });
    }

    /// Raw value at `column`, or [`CellValue::None`] when the column was not read.
    pub fn get(&self, column: u16) -> &CellValue {
        self.cells
            .iter()
            .find(|cell| cell.column == column)
            .map(|cell| &cell.value)
            .unwrap_or(&NONE_CELL)
    }

    /// A row is empty when every bound cell is absent.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.value.is_none())
    }
}

/// A decoded data row: the caller's record plus its source row and error text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record<T> {
    /// 0-based sheet row the record was read from
    pub row_number: u32,
    /// Accumulated decode/validation errors; empty means no error
    pub error_message: String,
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(row_number: u32, data: T) -> Self {
        Self {
            row_number,
            error_message: String::new(),
            data,
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Append an error, separating it from earlier ones with [`ERROR_SEPARATOR`].
    pub fn push_error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if message.is_empty() {
            return;
        }
        if !self.error_message.is_empty() {
            self.error_message.push_str(ERROR_SEPARATOR);
        }
        self.error_message.push_str(message);
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

//==============================================================================
// Export model
//==============================================================================

/// A positioned cell produced at export time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportCell {
    pub row: u32,
    pub column: u16,
    pub content: CellWrite,
}

/// All cells generated for one exported record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub row: u32,
    pub cells: Vec<ExportCell>,
}
