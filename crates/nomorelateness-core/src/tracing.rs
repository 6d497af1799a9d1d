//! Logging setup shared by the library crates and the binary.
//!
//! Logs always go to stderr so table and join output on stdout stay clean.
//! `RUST_LOG` wins over the configured level when it is set.
//!
//! ```ignore
//! use nomorelateness_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Prefix shared by every crate target in the workspace.
const WORKSPACE_TARGET: &str = "nomorelateness";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, human oriented.
    Pretty,
    /// One short line per event.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Settings for [`init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for workspace crates when no filter is given.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Adds module path, file and line to each line.
    pub verbose: bool,
    pub timestamps: bool,
    /// Logs span open and close.
    pub span_events: bool,
    /// A full `EnvFilter` directive, replacing `level`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    /// Warnings only, compact, no timestamps.
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: TracingOutputFormat::Compact,
            verbose: false,
            timestamps: false,
            span_events: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Debug level with source locations, for `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose: true,
            ..Self::default()
        }
    }

    /// JSON lines with timestamps and span events, for log collectors.
    #[must_use]
    pub fn structured() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Json,
            verbose: true,
            timestamps: true,
            span_events: true,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The filter to install: the explicit one, else `RUST_LOG`, else `level`.
    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(self.level)))),
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .with_file(self.verbose)
            .with_line_number(self.verbose)
            .with_span_events(spans);

        match (self.format, self.timestamps) {
            (TracingOutputFormat::Pretty, true) => layer.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
            (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
            (TracingOutputFormat::Json, true) => layer.json().boxed(),
            (TracingOutputFormat::Json, false) => layer.json().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, early in `main`.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(config.fmt_layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// `nomorelateness=<level>`, matching every workspace crate.
fn default_directive(level: Level) -> String {
    format!("{WORKSPACE_TARGET}={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, TracingOutputFormat::Compact);
        assert!(!config.verbose);
        assert!(!config.timestamps);
    }

    #[test]
    fn debug_only_changes_level_and_detail() {
        let config = TracingConfig::cli_debug();
        assert_eq!(
            config,
            TracingConfig {
                level: Level::DEBUG,
                verbose: true,
                ..TracingConfig::default()
            }
        );
    }

    #[test]
    fn structured_is_json() {
        let config = TracingConfig::structured();
        assert_eq!(config.format, TracingOutputFormat::Json);
        assert!(config.timestamps);
        assert!(config.span_events);
    }

    #[test]
    fn builders() {
        let config = TracingConfig::default()
            .with_level(Level::TRACE)
            .with_format(TracingOutputFormat::Pretty)
            .with_env_filter("nomorelateness_core=trace");

        assert_eq!(config.level, Level::TRACE);
        assert_eq!(config.format, TracingOutputFormat::Pretty);
        assert_eq!(config.filter.as_deref(), Some("nomorelateness_core=trace"));
    }

    #[test]
    fn explicit_filter_is_parsed() {
        let config = TracingConfig::default().with_env_filter("nomorelateness=debug,reqwest=warn");
        assert!(config.env_filter().is_ok());

        let config = TracingConfig::default().with_env_filter("nomorelateness=loud");
        assert!(matches!(config.env_filter(), Err(TracingError::EnvFilter(_))));
    }

    #[test]
    fn default_directive_covers_workspace() {
        assert_eq!(default_directive(Level::DEBUG), "nomorelateness=DEBUG");
        assert!(EnvFilter::try_new(default_directive(Level::WARN)).is_ok());
    }
}
