//! Telemetry initialization, driven by `TRIALFOLD_LOG_FORMAT`:
//! - unset or `"plain"` → human-readable events to stderr
//! - `"json"` → JSON events to stderr, one object per line
//!
//! Filtering follows `RUST_LOG` (`EnvFilter` syntax), defaulting to `info`.
//! Batch jobs run under cron; everything diagnostic goes to stderr so stdout
//! stays clean for the job summary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Initialize the global tracing subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TRIALFOLD_LOG_FORMAT").is_ok_and(|v| v == "json");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
