//! Import and export service implementations.

pub mod export;
pub mod import;

pub use export::{ExportOptions, ExportResult, export_batch, export_to_path};
pub use import::{ImportOptions, ImportResult, read_queries, read_queries_from_path};
