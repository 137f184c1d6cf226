//! quarry-worker: execution host in its own process.
//!
//! Reads length-prefixed MessagePack requests from stdin and writes the
//! responses to stdout. Logs go to stderr, filtered by `QUARRY_LOG`
//! (default `warn`). Exits when stdin closes.

use std::io;
use std::process;

use quarry_executor::{serve, FrameChannel};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "QUARRY_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries frames; nothing else may write to it.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

fn main() {
    init_logging();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut channel = FrameChannel::new(stdin.lock(), stdout.lock());

    if let Err(e) = serve(&mut channel) {
        error!(target: "quarry::host", error = %e, "Worker stopped");
        process::exit(1);
    }
}
