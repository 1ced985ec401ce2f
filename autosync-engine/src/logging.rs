use tracing_subscriber::{fmt, EnvFilter};

/// Level used when `RUST_LOG` is unset. Progress already goes to
/// `git-sync.log`, so scheduled runs only print warnings to stderr.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr diagnostics subscriber. Repeated calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
