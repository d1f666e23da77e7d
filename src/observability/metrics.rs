//! Prometheus metrics.
//!
//! The recorder is process-local; there is no HTTP listener. A text
//! snapshot can be rendered or written to a file after a run.

use crate::config::MetricsConfig;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::{Path, PathBuf};

/// Handle to the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
    snapshot_path: Option<PathBuf>,
}

impl MetricsHandle {
    /// Renders the current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }

    /// Writes a snapshot to the configured path, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the file cannot be written.
    pub fn flush(&self) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => write_snapshot(&self.render(), path),
            None => Ok(()),
        }
    }
}

/// Installs the Prometheus recorder when metrics are enabled.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;
    Ok(Some(MetricsHandle {
        prometheus,
        snapshot_path: config.snapshot_path.clone(),
    }))
}

fn write_snapshot(payload: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_metrics_dir".to_string(),
            cause: e.to_string(),
        })?;
    }
    std::fs::write(path, payload).map_err(|e| Error::OperationFailed {
        operation: "write_metrics_snapshot".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    tracing::debug!(path = %path.display(), bytes = payload.len(), "Wrote metrics snapshot");
    Ok(())
}
