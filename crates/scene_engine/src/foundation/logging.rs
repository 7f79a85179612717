//! Logging utilities
//!
//! The crate logs through the `log` facade; hosts pick the sink. These helpers
//! install `env_logger` for binaries and tests that do not bring their own.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a default filter
///
/// `RUST_LOG` still takes precedence when set. The level string uses the
/// `env_logger` filter syntax (`"info"`, `"scene_engine=debug"`, ...).
///
/// # Arguments
/// * `level` - Filter applied when `RUST_LOG` is absent
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::debug!("Logging initialised with default filter '{}'", level);
    }
}
