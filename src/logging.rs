//! Logging configuration using tracing
//!
//! Diagnostics go to stderr so list output on stdout stays pipeable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is unset
///
/// Quiet by default; `--verbose` shows loads, saves and conflict resolution.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "mailbase=info"
    } else {
        "warn"
    }
}

/// Initialize the tracing subscriber
///
/// RUST_LOG takes precedence over `verbose`, e.g. `RUST_LOG=mailbase=debug`
/// also shows every collection mutation.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init(verbose: bool) -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::MailbaseError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}
