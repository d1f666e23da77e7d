//! Log filter and format resolution.

use crate::config::{LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolved logging settings.
#[derive(Debug)]
pub struct LogSettings {
    /// Level filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr otherwise.
    pub file: Option<PathBuf>,
    /// Configured directive that failed to parse, reported after init.
    pub rejected_directive: Option<String>,
}

impl LogSettings {
    /// Resolves settings from config and the CLI verbosity count.
    ///
    /// `RUST_LOG` wins when set. Otherwise `-v` raises the crate to
    /// `debug` and `-vv` to `trace`, falling back to the configured level.
    #[must_use]
    pub fn resolve(config: &LoggingConfig, verbosity: u8) -> Self {
        let directive = match verbosity {
            0 => config.level.clone(),
            1 => format!("{},intent_analyzer=debug", config.level),
            _ => format!("{},intent_analyzer=trace", config.level),
        };
        let mut rejected_directive = None;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&directive).unwrap_or_else(|_| {
                rejected_directive = Some(directive.clone());
                EnvFilter::new("warn")
            })
        });

        Self {
            filter,
            format: config.format,
            file: config.file.clone(),
            rejected_directive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_format_and_file() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            file: Some(PathBuf::from("/tmp/intent.log")),
        };
        let settings = LogSettings::resolve(&config, 0);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/intent.log")));
    }

    #[test]
    fn test_resolve_accepts_bad_directive() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
            ..LoggingConfig::default()
        };
        let settings = LogSettings::resolve(&config, 2);
        assert_eq!(settings.format, LogFormat::Pretty);
    }
}
