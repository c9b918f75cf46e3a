//! Tracing subscriber setup.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Install a stderr `fmt` subscriber as the global default.
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` when verbose).
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
