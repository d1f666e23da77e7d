//! JSON format adapter for import/export.
//!
//! Imports a JSON array of strings or of objects with a `query` field.
//! Exports a single report document with a generation timestamp, the batch
//! summary and every row.

use crate::io::traits::{ExportRow, ExportSink, ImportSource};
use crate::models::BatchSummary;
use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryEntry {
    Plain(String),
    Object {
        #[serde(alias = "keyword")]
        query: String,
    },
}

/// JSON import source.
pub struct JsonImportSource<R: BufRead> {
    reader: Option<R>,
    buffer: std::vec::IntoIter<String>,
}

impl<R: BufRead> JsonImportSource<R> {
    /// Creates a new JSON import source.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            buffer: Vec::new().into_iter(),
        }
    }

    fn load(reader: R) -> Result<Vec<String>> {
        let entries: Vec<QueryEntry> = serde_json::from_reader(reader)
            .map_err(|e| Error::InvalidInput(format!("Failed to parse JSON array: {e}")))?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                QueryEntry::Plain(query) | QueryEntry::Object { query } => query,
            })
            .collect())
    }
}

impl<R: BufRead> ImportSource for JsonImportSource<R> {
    fn next(&mut self) -> Result<Option<String>> {
        if let Some(reader) = self.reader.take() {
            self.buffer = Self::load(reader)?.into_iter();
        }
        Ok(self.buffer.next())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    summary: &'a BatchSummary,
    results: &'a [ExportRow],
}

/// JSON export sink.
///
/// Rows are buffered and written as one document on finalize.
pub struct JsonExportSink<W: Write> {
    writer: W,
    rows: Vec<ExportRow>,
}

impl<W: Write> JsonExportSink<W> {
    /// Creates a new JSON export sink.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            rows: Vec::new(),
        }
    }
}

impl<W: Write> ExportSink for JsonExportSink<W> {
    fn write(&mut self, row: &ExportRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finalize(mut self: Box<Self>, summary: &BatchSummary) -> Result<()> {
        let report = Report {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            summary,
            results: &self.rows,
        };
        serde_json::to_writer_pretty(&mut self.writer, &report).map_err(|e| {
            Error::OperationFailed {
                operation: "write_json".to_string(),
                cause: e.to_string(),
            }
        })?;
        let flushed = match writeln!(self.writer) {
            Ok(()) => self.writer.flush(),
            Err(e) => Err(e),
        };
        flushed.map_err(|e| Error::OperationFailed {
            operation: "flush_json".to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchItem, BatchResult};
    use std::io::Cursor;

    #[test]
    fn test_import_mixed_entries() {
        let input = r#"["buy shoes", {"query": "weather"}, {"keyword": "gmail login"}]"#;
        let mut source = JsonImportSource::new(Cursor::new(input));
        assert_eq!(source.next().unwrap().as_deref(), Some("buy shoes"));
        assert_eq!(source.next().unwrap().as_deref(), Some("weather"));
        assert_eq!(source.next().unwrap().as_deref(), Some("gmail login"));
        assert!(source.next().unwrap().is_none());
    }

    #[test]
    fn test_import_rejects_non_array() {
        let mut source = JsonImportSource::new(Cursor::new(r#"{"query": "x"}"#));
        assert!(source.next().is_err());
    }

    #[test]
    fn test_export_report_shape() {
        let batch = BatchResult::new(
            vec![BatchItem::from_result("", Err(Error::Cancelled))],
            true,
        );
        let mut output = Vec::new();
        let mut sink = Box::new(JsonExportSink::new(&mut output));
        sink.write(&ExportRow::from_item(&batch.items()[0])).unwrap();
        sink.finalize(&batch.summary()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["results"][0]["error"], "cancelled before analysis started");
    }
}
