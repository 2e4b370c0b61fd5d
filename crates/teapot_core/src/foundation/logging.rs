//! Logging utilities
//!
//! Library code only talks to the `log` facade. Hosts call [`init`] once at
//! startup; verbosity follows `RUST_LOG` and defaults to `info`.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Initialize logging for tests, ignoring repeated calls
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
