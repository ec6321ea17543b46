//! Logging setup for the command line driver.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "warn,arteplus7=info";

/// Installs a stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` raises this crate to debug.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "info,arteplus7=debug"
    } else {
        DEFAULT_FILTER
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A host may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
