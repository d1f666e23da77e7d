//! Result export service.

use crate::io::formats::{Format, create_export_sink};
use crate::io::traits::ExportRow;
use crate::models::{BatchFilter, BatchResult};
use crate::{Error, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Options for result export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// File format to write.
    pub format: Format,
    /// Rows to keep.
    pub filter: BatchFilter,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: Format::Csv,
            filter: BatchFilter::default(),
        }
    }
}

impl ExportOptions {
    /// Sets the format.
    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the row filter.
    #[must_use]
    pub fn with_filter(mut self, filter: BatchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportResult {
    /// Rows written.
    pub exported: usize,
    /// Rows in the batch before filtering.
    pub total: usize,
    /// Format used.
    pub format: Format,
}

/// Writes a batch to `writer`.
///
/// The summary in a JSON report describes the filtered rows.
///
/// # Errors
///
/// Returns an error if the format cannot be exported or writing fails.
pub fn export_batch<W: Write>(
    writer: W,
    batch: &BatchResult,
    options: &ExportOptions,
) -> Result<ExportResult> {
    let filtered = batch.filtered(&options.filter);
    let mut sink = create_export_sink(writer, options.format)?;
    for item in filtered.items() {
        sink.write(&ExportRow::from_item(item))?;
    }
    sink.finalize(&filtered.summary())?;

    let result = ExportResult {
        exported: filtered.len(),
        total: batch.len(),
        format: options.format,
    };
    tracing::debug!(
        format = %result.format,
        exported = result.exported,
        total = result.total,
        "Exported results"
    );
    Ok(result)
}

/// Writes a batch to a file, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_to_path(
    path: &Path,
    batch: &BatchResult,
    options: &ExportOptions,
) -> Result<ExportResult> {
    if !options.format.supports_export() {
        return Err(Error::InvalidInput(format!(
            "{} format cannot be used for export",
            options.format
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_output_dir".to_string(),
            cause: e.to_string(),
        })?;
    }
    let file = std::fs::File::create(path).map_err(|e| Error::OperationFailed {
        operation: "create_output".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    export_batch(BufWriter::new(file), batch, options)
}
