//! Tracing/logging setup shared by every campus binary.

pub mod logging;

pub use logging::{LogConfig, LogFormat, init_with};

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init_with(&LogConfig::from_env());
}
