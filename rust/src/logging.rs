//! Logging macros for the scheduler with verbosity level control.
//!
//! Messages go through `tracing`; the host application decides where they end
//! up. The verbosity gate is checked before any formatting happens, so a run
//! with verbosity 0 pays nothing for its trace points.
//!
//! Verbosity levels:
//! - 0: SILENT
//! - 1: CHANGES (placements, day advances)
//! - 2: CHECKS (candidate consideration, skip reasons)
//! - 3: DEBUG (priority breakdowns, capacity internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: segment placements, day advances, items given up on.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: candidate consideration, skip reasons, readiness checks.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: priority breakdowns and block capacity bookkeeping.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}
