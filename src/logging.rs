//! Logging bootstrap.
//!
//! Controllers log through the `log` facade; embedders that have no logger
//! of their own can call [`init`] once at startup to get env_logger output
//! (`RUST_LOG=screenshare=debug` etc.).

/// Initialize env_logger. Panics if a global logger is already set.
pub fn init() {
    env_logger::init();
}

/// Initialize env_logger, ignoring an already-installed logger.
///
/// Safe to call from tests that run in one process.
pub fn try_init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
