//! Logging setup for binaries and tools embedding the library

use tracing_subscriber::EnvFilter;

/// Builds the log filter for a verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the verbosity mapping.
pub fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if quiet {
        // Only show errors
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::new("sumi_lens=info,warn"),
        1 => EnvFilter::new("sumi_lens=debug,info"),
        2 => EnvFilter::new("sumi_lens=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Installs a global fmt subscriber
///
/// Does nothing if a subscriber is already installed, so calling it from
/// several entry points (or tests) is harmless.
pub fn init_logging(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .try_init();
}
