//! Schema-driven mapping between worksheet rows and typed records
//!
//! - [`binding`]: column ↔ field declarations, resolved once per type
//! - [`coerce`]: raw cell → field conversions
//! - [`decoder`]: one raw row → one [`Record`](crate::types::Record)
//! - [`importer`] / [`exporter`]: whole-sheet import and export
//! - [`annotator`]: error text written back next to the offending rows

pub mod annotator;
pub mod binding;
pub mod coerce;
pub mod decoder;
pub mod exporter;
pub mod importer;

pub use annotator::{annotate_errors, ErrorAnnotator, DEFAULT_ERROR_HEADER};
pub use binding::{Binding, FieldKind, FieldType, Schema, SheetRecord};
pub use coerce::{assign_direct, FieldValue};
pub use decoder::RowDecoder;
pub use exporter::{
    export_rows, uniform_style, CellStyleFn, ExportReport, SheetExporter, SkippedCell,
};
pub use importer::{import_rows, ImportContext, SheetImporter};
