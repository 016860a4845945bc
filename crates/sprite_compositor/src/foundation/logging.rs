//! Logging macros and `env_logger` setup

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`, using `filter` when `RUST_LOG` is unset
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
