//! Tracing infrastructure for tsync.
//!
//! Enable with `--features tracing`. All trace macros become no-ops when
//! the feature is disabled, so the broadcast loop carries no logging cost
//! in default builds.

/// Initialize the tracing subscriber with uptime timestamps.
///
/// Call this at the start of tests or a binary to enable trace output.
/// Repeated calls are ignored. Does nothing if the `tracing` feature is not
/// enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tsync=debug"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

// When tracing is enabled, re-export macros from the tracing crate.
#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, info, trace, warn};

// Without the feature every level expands to nothing.
#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {
    discard as debug, discard as error, discard as info, discard as trace, discard as warn,
};
