//! Logging setup helpers.

use tracing_subscriber::EnvFilter;

/// Install a default fmt subscriber if the embedding application has not set
/// one. Honors `RUST_LOG` when present and otherwise enables info-level
/// events from this crate only, so pool lifecycle milestones show up without
/// drowning callers in their own dependencies' output. Safe to call from
/// multiple tests or binaries; only the first call has any effect.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("workpool=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
