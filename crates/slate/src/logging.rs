//! Subscriber setup for the CLI.
//!
//! The core library only emits `tracing` events. Installing a subscriber is
//! left to this binary, so embedders and tests choose their own.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `"json"` selects JSON; anything else is pretty.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Stdout is left alone so listings can be piped.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr())),
            )
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {e}");
    }
}

/// Initialize from the `[logging]` section; `--verbose` and `--json-logs` win.
pub fn init_from_config(config: &slate_core::Config, verbose: bool, json_logs: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let format = if json_logs {
        LogFormat::Json
    } else {
        LogFormat::from_name(&config.logging.format)
    };
    init(level, format);
}
