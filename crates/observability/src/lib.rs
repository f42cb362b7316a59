//! Process-wide log setup for binaries embedding the console core.

/// Install the tracing subscriber.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    tracing::init(DEFAULT_FILTER);
}

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

pub mod tracing;
