//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter for a `-v` count; `RUST_LOG` wins when set
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialize the global subscriber, logging to stderr so stdout stays pipeable
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // Already initialized (e.g. by a test harness) is fine
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
