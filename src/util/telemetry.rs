//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` when the variable is unset or invalid.
///
/// Does nothing if a global subscriber is already installed, so tests and embedding
/// applications may set their own.
pub fn init_tracing(default_directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("warn");
        init_tracing("debug");
        assert!(tracing::dispatcher::has_been_set());
    }
}
