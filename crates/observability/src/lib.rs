//! Process-wide logging setup shared by every stockwise binary and test suite.

pub mod subscriber;

pub use subscriber::{LogFormat, ENV_LOG_FORMAT};

/// Install the global subscriber: JSON lines, filtered by `RUST_LOG`
/// (default `info`).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}

/// Human-readable output captured by the test harness.
pub fn init_for_tests() {
    subscriber::init_test();
}
