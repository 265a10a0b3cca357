//! Logging initialization for embedding applications.
//!
//! The store itself only emits `tracing` events (`debug!`/`warn!` on
//! reconciliation and repair paths, per spec §4.2/§7); this module is a
//! thin, optional helper for binaries that embed the store and want a
//! sane default subscriber, following the `tracing-subscriber` usage
//! implied by the teacher crate's dependency table.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// `verbose` lowers the default filter to `debug`; `quiet` raises it to
/// `warn`. The `ISSUE_STORE_LOG` environment variable always takes
/// precedence when set.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging(verbose: bool, quiet: bool) -> std::result::Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let default_level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_env("ISSUE_STORE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
}
