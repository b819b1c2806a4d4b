//! Tracing subscriber setup.
//!
//! Log level comes from `RUST_LOG` (default `appauth=info`). Output goes to
//! stdout, or is appended to the service file's `log-file` when one is set.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "appauth=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns the I/O error if `log_file` can't be opened for appending. No
/// subscriber is installed in that case.
pub fn init(log_file: Option<&Path>) -> std::io::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}

/// Install stdout logging unless a subscriber is already set.
///
/// Used on fatal paths that may run before or after [`init`].
pub fn ensure_default() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unopenable_log_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing-dir").join("appauth.log");

        assert!(init(Some(&path)).is_err());
    }

    #[test]
    fn test_ensure_default_is_idempotent() {
        ensure_default();
        ensure_default();
        tracing::info!("still logging");
    }
}
