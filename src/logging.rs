use tracing_subscriber::{EnvFilter, fmt};

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
