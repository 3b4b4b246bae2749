//! Tracing setup for the `radar-portal` binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Installing twice is a no-op, so tests may call this freely.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
