//! Tracing subscriber setup for the node binary.
//!
//! The format is picked once at startup: pretty output for a terminal,
//! JSON lines for a log shipper. Filtering follows `RUST_LOG` when set,
//! e.g. `RUST_LOG=hongbao_node=debug,hongbao_engine=info`. Logs go to
//! stderr; stdout stays reserved for the `status` subcommand's JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl LogFormat {
    /// `"json"` selects JSON lines; any other value falls back to pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Installs the global tracing subscriber. Call once from `main`; a
/// second call panics.
///
/// `default_level` is the filter used when `RUST_LOG` is unset.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }

    tracing::debug!(?format, "tracing subscriber installed");
}
