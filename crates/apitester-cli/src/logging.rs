//! Tracing setup for the CLI.
//!
//! Logs go to stderr so `apitester run` output on stdout stays clean.
//! Verbosity follows `RUST_LOG`; the default is INFO for apitester and
//! WARN for dependencies.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "apitester=info,apitester_core=info,warn";

/// Initialize tracing for every command.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
