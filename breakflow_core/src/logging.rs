//! Where breakflow's `tracing` output ends up.
//!
//! The engine and the media broker only emit events. A host picks the
//! sink once at startup; the terminal host sends everything to stderr so
//! the redrawn status line and `--json` stdout are never interleaved with
//! log lines.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when neither `RUST_LOG` nor the host asks for another one
pub const DEFAULT_LEVEL: &str = "warn";

/// Quiet setup for the interactive host: rejected commands and clock
/// regressions only.
pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Install a stderr subscriber, `RUST_LOG` overriding `default_level`.
///
/// Calling it twice is harmless; the first subscriber stays.
pub fn init_with_level(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Engine transitions at debug, routed through libtest's capture
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .without_time()
        .with_env_filter(EnvFilter::new("breakflow_core=debug"))
        .try_init();
}
