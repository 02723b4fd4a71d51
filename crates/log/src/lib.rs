//! Minimal tracing-subscriber bootstrap shared by the demo binary and by
//! integration tests that want visible spans.
//!
//! This deliberately stays small: one env-driven filter, one format
//! choice. Crates that need richer telemetry (file rotation, OpenTelemetry
//! export, reload handles) are expected to build their own subscriber on
//! top of `tracing` directly — this crate only covers the common case.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable, ANSI-colored lines. Default for local development.
    #[default]
    Pretty,
    /// Newline-delimited JSON, suited to log aggregation pipelines.
    Json,
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` directive string, e.g. `"info"` or
    /// `"meridian_telemetry=debug,info"`. Defaults to `RUST_LOG` or
    /// `"info"` when that variable is absent or invalid.
    pub filter: String,
    /// Output format.
    pub format: Format,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: Format::Pretty,
        }
    }
}

/// Initialize the global `tracing` subscriber. Safe to call at most once
/// per process; a second call is a no-op that logs a warning rather than
/// panicking, so tests that each try to install a subscriber don't abort
/// the whole suite.
pub fn init(config: Config) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.format {
        Format::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        Format::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };

    if let Err(err) = result {
        eprintln!("meridian-log: subscriber already initialized: {err}");
    }
}

/// Convenience entry point using all defaults (`RUST_LOG` or `"info"`,
/// pretty-printed).
pub fn init_default() {
    init(Config::default());
}
