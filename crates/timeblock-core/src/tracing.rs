//! Log setup for the `timeblock` binary.
//!
//! Logs always go to stderr; stdout carries command output only. The
//! default filter covers the `timeblock*` crates at WARN, or DEBUG with
//! `--debug`. `RUST_LOG` replaces the default filter entirely. With `--json`
//! each log line is a JSON object carrying the current span, so a run's
//! day-by-day records can be collected next to the JSON result.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors from [`init_tracing`].
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("logging already initialized: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// How the CLI logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level applied to the `timeblock*` targets when `RUST_LOG` is unset.
    pub level: Level,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Include target, file and line in each record.
    pub show_source: bool,
}

impl TracingConfig {
    /// Warnings only, no source locations.
    #[must_use]
    pub fn cli_quiet() -> Self {
        Self {
            level: Level::WARN,
            json: false,
            show_source: false,
        }
    }

    /// Everything down to DEBUG, with source locations.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            json: false,
            show_source: true,
        }
    }

    /// The preset matching the global `--debug` and `--json` flags.
    #[must_use]
    pub fn for_cli(debug: bool, json: bool) -> Self {
        let config = if debug {
            Self::cli_debug()
        } else {
            Self::cli_quiet()
        };
        config.with_json(json)
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// The filter directive used when `RUST_LOG` is unset.
    pub fn directive(&self) -> String {
        format!("timeblock={}", self.level.as_str().to_ascii_lowercase())
    }

    /// Builds the filter; a non-blank `rust_log` wins over [`directive`](Self::directive).
    pub fn env_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, TracingError> {
        let directive = match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
            Some(custom) => custom.to_string(),
            None => self.directive(),
        };
        EnvFilter::try_new(&directive).map_err(|source| TracingError::Filter { directive, source })
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::cli_quiet()
    }
}

/// Installs the global subscriber. Call once, before any command runs.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = config.env_filter(rust_log.as_deref())?;

    let layer = if config.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(config.show_source)
            .with_file(config.show_source)
            .with_line_number(config.show_source)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .without_time()
            .with_target(config.show_source)
            .with_file(config.show_source)
            .with_line_number(config.show_source)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
