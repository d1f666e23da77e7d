//! Query import and result export.
//!
//! # Architecture
//!
//! - **Format adapters** implement [`ImportSource`] and [`ExportSink`]
//! - **Services** apply blank-line skipping, de-duplication and filtering
//!   the same way for every format
//!
//! # Supported Formats
//!
//! | Format | Import | Export | Notes |
//! |--------|--------|--------|-------|
//! | Text | ✓ | - | One query per line |
//! | CSV | ✓ | ✓ | `query`/`keyword` column on import; one row per query on export |
//! | JSON | ✓ | ✓ | Array of strings on import; report with summary on export |
//!
//! # Example
//!
//! ```rust
//! use intent_analyzer::io::{Format, ImportOptions, read_queries};
//!
//! let input = "query,volume\nbuy shoes,100\n\nbuy shoes,90\n";
//! let options = ImportOptions::default().with_format(Format::Csv);
//! let result = read_queries(input.as_bytes(), options)?;
//! assert_eq!(result.queries, vec!["buy shoes"]);
//! # Ok::<(), intent_analyzer::Error>(())
//! ```

pub mod formats;
pub mod services;
pub mod traits;

pub use formats::Format;
pub use services::{
    ExportOptions, ExportResult, ImportOptions, ImportResult, export_batch, export_to_path,
    read_queries, read_queries_from_path,
};
pub use traits::{ExportRow, ExportSink, ImportSource};
