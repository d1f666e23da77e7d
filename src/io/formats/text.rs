//! Plain text format: one query per line.

use crate::io::traits::ImportSource;
use crate::{Error, Result};
use std::io::BufRead;

/// Line-oriented import source.
pub struct TextImportSource<R: BufRead> {
    reader: R,
    line: String,
}

impl<R: BufRead> TextImportSource<R> {
    /// Creates a new text import source.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> ImportSource for TextImportSource<R> {
    fn next(&mut self) -> Result<Option<String>> {
        self.line.clear();
        let bytes_read = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| Error::OperationFailed {
                operation: "read_text".to_string(),
                cause: e.to_string(),
            })?;
        if bytes_read == 0 {
            return Ok(None);
        }
        let line = self.line.trim_end_matches(['\r', '\n']);
        Ok(Some(line.strip_prefix('\u{feff}').unwrap_or(line).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_including_blank() {
        let mut source = TextImportSource::new(Cursor::new("\u{feff}buy shoes\r\n\nweather\n"));
        assert_eq!(source.next().unwrap().as_deref(), Some("buy shoes"));
        assert_eq!(source.next().unwrap().as_deref(), Some(""));
        assert_eq!(source.next().unwrap().as_deref(), Some("weather"));
        assert!(source.next().unwrap().is_none());
    }
}
