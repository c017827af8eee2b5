//! Structured logging setup.
//!
//! Logs go to stderr so stdout stays clean for `--output json`. `RUST_LOG`
//! wins when set; otherwise the level follows the `-v` count.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive for a verbosity count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "basefix=info",
        1 => "basefix=debug",
        _ => "basefix=trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
