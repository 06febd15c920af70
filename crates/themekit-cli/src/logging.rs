//! Logging initialization for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `verbosity` 0 = INFO, 1 = DEBUG, 2+ = TRACE. With `json`, one JSON
/// object per line is written to stderr. `RUST_LOG` adds directives on top.
///
/// # Panics
/// Panics if a global subscriber is already set.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG directives first, verbosity flag on top
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Ok(directive) = format!("themekit={level}").parse() {
        filter = filter.add_directive(directive);
    }
    let filter = filter.add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
