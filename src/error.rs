use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open workbook: {0}")]
    Open(String),

    #[error("Failed to save workbook: {0}")]
    Save(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Start row {start_row} is beyond the sheet's {row_count} rows")]
    Range { start_row: u32, row_count: u32 },

    #[error("No worksheet selected: open a workbook and select a sheet before importing")]
    UninitializedSource,

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    /// Annotation target row was never created; `-1` is the header row above row 0
    #[error("Row {0} does not exist in the sheet")]
    RowNotFound(i64),

    #[error("invalid value at col {column}: {detail}")]
    Decode { column: u16, detail: String },

    #[error("Unsupported type {type_name}: {detail}")]
    UnsupportedType {
        type_name: &'static str,
        detail: String,
    },

    #[error("Invalid cell ({row}, {column}): {detail}")]
    InvalidCell { row: u32, column: u16, detail: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
