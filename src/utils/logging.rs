//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The polling path runs every second, so modules on it can be silenced
//! wholesale without touching `RUST_LOG`:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("muting for break ending at {}", window.end);
//! ```

/// `log::debug!` when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::error!` when the calling module's `ENABLE_LOGS` is set.
///
/// Failures on the polling path are never fatal, so this is the loudest
/// level they reach.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
