//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the OCR gateway, the image pipeline, the DB worker) declare
//! the flag and log through these macros so they can be silenced one at a time
//! without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("Processing OCR for file: {}", path.display());
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_if_enabled {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

/// `log::debug!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__log_if_enabled!(debug, $($arg)*)
    };
}

/// `log::info!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__log_if_enabled!(info, $($arg)*)
    };
}

/// `log::warn!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log_if_enabled!(warn, $($arg)*)
    };
}

/// `log::error!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log_if_enabled!(error, $($arg)*)
    };
}
