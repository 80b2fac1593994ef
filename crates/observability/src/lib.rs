//! Tracing and logging setup shared by the warehouse binaries.

/// Initialize process-wide tracing from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (format, filters).
pub mod tracing;

pub use self::tracing::{LOG_FORMAT_VAR, LogFormat, UnknownLogFormat, init_with};
