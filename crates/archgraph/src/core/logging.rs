//! Logging infrastructure
//!
//! Structured logging uses the `tracing` crate. Every pipeline stage opens a
//! span (`validate_graph`, `execute_query`, `render_mermaid`) and reports
//! counts as structured fields. Output goes to stderr, leaving stdout for the
//! YAML or Mermaid text the caller asked for.
//!
//! # Usage
//!
//! ```rust
//! use archgraph::core::logging::init_logging;
//!
//! // Level and format come from the environment, or fall back to defaults.
//! // Errors if a global subscriber is already installed.
//! let _ = init_logging(None, None);
//! ```
//!
//! # Environment Variables
//!
//! - `ARCHGRAPH_LOG_LEVEL`: log level or filter directive (trace|debug|info|warn|error|off)
//! - `ARCHGRAPH_LOG_FORMAT`: output format (compact|pretty|json)
//! - `RUST_LOG`: standard `tracing-subscriber` filter, used when no level is given
//!
//! # Filtering Logs
//!
//! ```bash
//! # Trace the query engine only
//! RUST_LOG="archgraph::query=trace" archgraph execute-query --config c.yaml --query q.yaml
//!
//! # Info everywhere, debug for the diagram layout
//! RUST_LOG="info,archgraph::mermaid=debug" archgraph generate-mermaid --config c.yaml
//! ```

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line format
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Unknown log format: {} (expected one of: {})",
                s,
                LogFormat::variants().join(", ")
            )),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolve the effective level: argument, `ARCHGRAPH_LOG_LEVEL`, `RUST_LOG`, `info`
fn resolve_level(level: Option<&str>) -> String {
    level
        .map(|s| s.to_string())
        .or_else(|| std::env::var("ARCHGRAPH_LOG_LEVEL").ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string())
}

/// Resolve the effective format: argument, `ARCHGRAPH_LOG_FORMAT`, `compact`
fn resolve_format(format: Option<&str>) -> String {
    format
        .map(|s| s.to_string())
        .or_else(|| std::env::var("ARCHGRAPH_LOG_FORMAT").ok())
        .unwrap_or_else(|| "compact".to_string())
}

/// Initialize the tracing subscriber with the given log level and format
///
/// # Arguments
///
/// * `level` - Optional level or filter directive. If None, uses
///   `ARCHGRAPH_LOG_LEVEL` or `RUST_LOG`, or defaults to `info`.
/// * `format` - Optional format (compact|pretty|json). If None, uses
///   `ARCHGRAPH_LOG_FORMAT`, or defaults to `compact`.
///
/// # Errors
///
/// Returns an error for an unknown format, or if a global subscriber is
/// already installed.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = resolve_level(level);
    let log_format = resolve_format(format);

    let filter = if log_level == "off" {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let format =
        LogFormat::from_str(&log_format).map_err(|e| format!("Invalid log format: {}", e))?;

    match format {
        LogFormat::Compact => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_level(true)
                        .with_file(false)
                        .with_line_number(false)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init()?;
        }
        LogFormat::Pretty => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .pretty(),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .json(),
                )
                .try_init()?;
        }
    }

    Ok(())
}
