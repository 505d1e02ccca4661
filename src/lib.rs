//! Sheetmap - schema-driven mapping between spreadsheet rows and typed records
//!
//! A record type declares which column feeds which field. The library then
//! imports rows into typed records (capturing per-row conversion errors),
//! exports records back into a template sheet, and writes error text next to
//! the offending rows so the file can be handed back to whoever filled it in.
//!
//! # Features
//!
//! - Column bindings resolved once per type and cached
//! - Row decoding with type coercion and partial population on failure
//! - Validation hooks with a typed caller context
//! - Export with formula pass-through and per-column styling
//! - Error-column annotation of the source workbook
//! - Excel import via calamine, export via rust_xlsxwriter
//!
//! # Example
//!
//! ```no_run
//! use royalbit_sheetmap::bind;
//! use royalbit_sheetmap::mapping::{Binding, SheetRecord};
//! use royalbit_sheetmap::session::ImportSession;
//! use royalbit_sheetmap::types::Record;
//! use chrono::NaiveDateTime;
//!
//! #[derive(Debug, Default)]
//! struct Student {
//!     name: String,
//!     age: i32,
//!     birthday: Option<NaiveDateTime>,
//! }
//!
//! impl SheetRecord for Student {
//!     fn columns() -> Vec<Binding<Self>> {
//!         vec![
//!             bind!(Student, 0 => name),
//!             bind!(Student, 1 => age),
//!             bind!(Student, 2 => birthday),
//!         ]
//!     }
//! }
//!
//! let mut session = ImportSession::open("students.xlsx")?;
//! let records = session.import_with_hook(0usize, 1, 3, |mut record: Record<Student>, _| {
//!     if record.birthday.is_none() {
//!         record.push_error("birthday can not be null");
//!     }
//!     record
//! })?;
//!
//! let failed: Vec<_> = records.into_iter().filter(|r| r.has_error()).collect();
//! if !failed.is_empty() {
//!     session.write_error_file(&failed, "students.errors.xlsx", "Error")?;
//! }
//! # Ok::<(), royalbit_sheetmap::error::SheetError>(())
//! ```

pub mod cli;
pub mod error;
pub mod mapping;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use error::{SheetError, SheetResult};
pub use mapping::{
    annotate_errors, export_rows, import_rows, Binding, ErrorAnnotator, ImportContext, Schema,
    SheetExporter, SheetImporter, SheetRecord,
};
pub use session::ImportSession;
pub use snapshot::{snapshot_sheet, SheetSnapshot};
pub use types::{CellValue, Record};
pub use workbook::{CellFormat, CellStyle, SheetRead, SheetSelector, SheetWrite, Workbook, Worksheet};
