//! CSV format adapter for import/export.

use crate::io::traits::{ExportRow, ExportSink, ImportSource};
use crate::models::BatchSummary;
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Header names accepted for the query column.
const QUERY_COLUMNS: [&str; 5] = ["query", "keyword", "keywords", "search_term", "search term"];

/// CSV import source.
///
/// The first row must be a header naming a query column
/// (`query`, `keyword`, ...). Other columns are ignored.
pub struct CsvImportSource<R: BufRead> {
    reader: csv::Reader<R>,
    column: usize,
    record: csv::StringRecord,
}

impl<R: BufRead> CsvImportSource<R> {
    /// Creates a new CSV import source.
    ///
    /// # Errors
    ///
    /// Returns an error if headers cannot be read or no query column exists.
    pub fn new(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers().map_err(|e| Error::OperationFailed {
            operation: "read_csv_headers".to_string(),
            cause: e.to_string(),
        })?;
        let column = headers
            .iter()
            .position(|h| {
                let h = h.trim_start_matches('\u{feff}').to_lowercase();
                QUERY_COLUMNS.contains(&h.as_str())
            })
            .ok_or_else(|| {
                Error::InvalidInput(
                    "CSV must have a 'query' column (or 'keyword', 'search_term')".to_string(),
                )
            })?;

        Ok(Self {
            reader: csv_reader,
            column,
            record: csv::StringRecord::new(),
        })
    }
}

impl<R: BufRead> ImportSource for CsvImportSource<R> {
    fn next(&mut self) -> Result<Option<String>> {
        let has_record = self
            .reader
            .read_record(&mut self.record)
            .map_err(|e| Error::OperationFailed {
                operation: "read_csv".to_string(),
                cause: e.to_string(),
            })?;
        if !has_record {
            return Ok(None);
        }
        Ok(Some(self.record.get(self.column).unwrap_or_default().to_string()))
    }
}

/// CSV export sink: one row per query, header first.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
    headers_written: bool,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates a new CSV export sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            headers_written: false,
        }
    }

    fn ensure_headers(&mut self) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(ExportRow::HEADERS)
                .map_err(|e| Error::OperationFailed {
                    operation: "write_csv_headers".to_string(),
                    cause: e.to_string(),
                })?;
            self.headers_written = true;
        }
        Ok(())
    }
}

impl<W: Write> ExportSink for CsvExportSink<W> {
    fn write(&mut self, row: &ExportRow) -> Result<()> {
        self.ensure_headers()?;
        self.writer
            .write_record(row.to_record())
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv".to_string(),
                cause: e.to_string(),
            })
    }

    fn finalize(mut self: Box<Self>, _summary: &BatchSummary) -> Result<()> {
        self.ensure_headers()?;
        self.writer.flush().map_err(|e| Error::OperationFailed {
            operation: "flush_csv".to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchResult;
    use std::io::Cursor;

    #[test]
    fn test_import_keyword_column() {
        let input = "id,Keyword,volume\n1,buy shoes,900\n2,\"weather, today\",100\n3,,5\n";
        let mut source = CsvImportSource::new(Cursor::new(input)).unwrap();
        assert_eq!(source.next().unwrap().as_deref(), Some("buy shoes"));
        assert_eq!(source.next().unwrap().as_deref(), Some("weather, today"));
        assert_eq!(source.next().unwrap().as_deref(), Some(""));
        assert!(source.next().unwrap().is_none());
    }

    #[test]
    fn test_import_requires_query_column() {
        let result = CsvImportSource::new(Cursor::new("name,volume\nfoo,1\n"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_export_writes_header() {
        let mut output = Vec::new();
        let sink = CsvExportSink::new(&mut output);
        Box::new(sink)
            .finalize(&BatchResult::default().summary())
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.trim_end(), ExportRow::HEADERS.join(","));
    }
}
