//! CLI command handlers

pub mod commands;

pub use commands::{annotate, snapshot, sheets, SnapshotFormat};
