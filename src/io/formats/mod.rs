//! Format adapters for query import and result export.

pub mod csv;
pub mod json;
pub mod text;

use crate::{Error, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use super::traits::{ExportSink, ImportSource};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Plain text, one query per line (import only).
    Text,
    /// CSV with a query column on import; one row per result on export.
    Csv,
    /// JSON array on import; report document on export.
    Json,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Detects format from file extension. Unknown extensions read as text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("csv") => Self::Csv,
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }

    /// Returns whether this format supports export.
    #[must_use]
    pub const fn supports_export(&self) -> bool {
        matches!(self, Self::Csv | Self::Json)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(Error::InvalidInput(format!("Unknown format: {s}"))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Creates an import source for the given format and reader.
///
/// # Errors
///
/// Returns an error if a CSV header lacks a query column.
pub fn create_import_source<'a, R: BufRead + 'a>(
    reader: R,
    format: Format,
) -> Result<Box<dyn ImportSource + 'a>> {
    match format {
        Format::Text => Ok(Box::new(text::TextImportSource::new(reader))),
        Format::Csv => Ok(Box::new(csv::CsvImportSource::new(reader)?)),
        Format::Json => Ok(Box::new(json::JsonImportSource::new(reader))),
    }
}

/// Creates an export sink for the given format and writer.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for formats that cannot be exported.
pub fn create_export_sink<'a, W: Write + 'a>(
    writer: W,
    format: Format,
) -> Result<Box<dyn ExportSink + 'a>> {
    match format {
        Format::Csv => Ok(Box::new(csv::CsvExportSink::new(writer))),
        Format::Json => Ok(Box::new(json::JsonExportSink::new(writer))),
        Format::Text => Err(Error::InvalidInput(
            "text format cannot be used for export; use csv or json".to_string(),
        )),
    }
}
