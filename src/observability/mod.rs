//! Observability: structured logging, metrics and request correlation.

mod logging;
mod metrics;
mod request_context;

pub use logging::LogSettings;
pub use metrics::{MetricsHandle, install_prometheus};
pub use request_context::{
    RequestContext, RequestContextGuard, current_request_id, enter_request_context,
};

use crate::config::{LogFormat, LoggingConfig, MetricsConfig};
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Handle for observability runtime components.
#[derive(Debug, Default)]
pub struct ObservabilityHandle {
    metrics: Option<MetricsHandle>,
}

impl ObservabilityHandle {
    /// The metrics recorder, if installed.
    #[must_use]
    pub const fn metrics(&self) -> Option<&MetricsHandle> {
        self.metrics.as_ref()
    }

    /// Writes the metrics snapshot, if configured. Errors are logged.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.metrics.take()
            && let Err(e) = handle.flush()
        {
            tracing::warn!(error = %e, "Failed to write metrics snapshot");
        }
    }
}

impl Drop for ObservabilityHandle {
    fn drop(&mut self) {
        if self.metrics.is_some() {
            self.shutdown();
        }
    }
}

/// Initializes logging and metrics for the process.
///
/// Logs go to stderr unless a file is configured, so command output on
/// stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if observability has already been initialized, the log
/// file cannot be opened, or a metrics recorder is already installed.
pub fn init(
    logging: &LoggingConfig,
    metrics: &MetricsConfig,
    verbosity: u8,
) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "observability already initialized".to_string(),
        });
    }

    let metrics_handle = install_prometheus(metrics)?;
    let settings = LogSettings::resolve(logging, verbosity);

    match (&settings.file, settings.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_thread_names(true),
                )
                .with(settings.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (Some(log_file), LogFormat::Pretty) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_names(true),
                )
                .with(settings.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .with(settings.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(false),
                )
                .with(settings.filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    if let Some(directive) = &settings.rejected_directive {
        tracing::warn!(directive = %directive, "Invalid log filter, using 'warn'");
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "failed to mark observability initialized".to_string(),
        })?;

    Ok(ObservabilityHandle {
        metrics: metrics_handle,
    })
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("intent.log");
        let mut writer = open_log_file(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        let mut second = open_log_file(&path).unwrap();
        second.write_all(b"second\n").unwrap();
        second.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
