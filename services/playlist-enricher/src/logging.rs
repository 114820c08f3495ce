//!
//! src/logging.rs
//!
//! Initializes logger so that the enricher gives informative,
//! structured output while it runs
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::EnrichError;

/// Keeps the background writer alive; dropping it flushes pending lines
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, EnrichError> {
    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    let time = fmt::time::UtcTime::rfc_3339();

    let json_layer = (cfg.format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_writer(writer.clone())
            .with_timer(time.clone())
            .with_target(cfg.include_target)
            .with_file(cfg.include_file_line)
            .with_line_number(cfg.include_file_line)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
    });

    let pretty_layer = (cfg.format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_writer(writer)
            .with_timer(time)
            .with_ansi(cfg.with_ansi)
            .with_target(cfg.include_target)
            .with_file(cfg.include_file_line)
            .with_line_number(cfg.include_file_line)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| EnrichError::Config(format!("logger init: {e}")))?;

    Ok( LoggingGuard(guard) )
}
