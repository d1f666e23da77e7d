//! Query import service.

use crate::io::formats::{Format, create_import_source};
use crate::{Error, Result};
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Options for query import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// File format to read.
    pub format: Format,
    /// Drop repeated queries, keeping the first occurrence.
    pub dedupe: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: Format::Text,
            dedupe: true,
        }
    }
}

impl ImportOptions {
    /// Sets the format.
    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables de-duplication.
    #[must_use]
    pub const fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }
}

/// Queries read from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Queries in input order, trimmed.
    pub queries: Vec<String>,
    /// Blank entries skipped.
    pub skipped_blank: usize,
    /// Repeated entries skipped.
    pub skipped_duplicates: usize,
}

/// Reads queries from a reader.
///
/// Entries are trimmed; blank entries are skipped. With `dedupe`, later
/// repeats of a query (compared case-insensitively) are dropped.
///
/// # Errors
///
/// Returns an error if the source cannot be parsed.
pub fn read_queries<R: BufRead>(reader: R, options: ImportOptions) -> Result<ImportResult> {
    let mut source = create_import_source(reader, options.format)?;
    let mut seen = HashSet::new();
    let mut result = ImportResult::default();

    while let Some(raw) = source.next()? {
        let query = raw.trim();
        if query.is_empty() {
            result.skipped_blank += 1;
            continue;
        }
        if options.dedupe && !seen.insert(query.to_lowercase()) {
            result.skipped_duplicates += 1;
            continue;
        }
        result.queries.push(query.to_string());
    }

    tracing::debug!(
        format = %options.format,
        queries = result.queries.len(),
        skipped_blank = result.skipped_blank,
        skipped_duplicates = result.skipped_duplicates,
        "Read queries"
    );
    Ok(result)
}

/// Reads queries from a file, detecting the format from its extension
/// unless `format` is given.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn read_queries_from_path(
    path: &Path,
    format: Option<Format>,
    dedupe: bool,
) -> Result<ImportResult> {
    let file = std::fs::File::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_input".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let options = ImportOptions::default()
        .with_format(format.unwrap_or_else(|| Format::from_path(path)))
        .with_dedupe(dedupe);
    read_queries(BufReader::new(file), options)
}
