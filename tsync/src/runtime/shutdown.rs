//! Cross-thread stop request observed by the broadcast loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The operator interrupted the process (SIGINT/SIGTERM).
    Interrupted,
    /// The transport provider went away.
    ProviderShutdown,
}

impl StopReason {
    const fn code(self) -> u8 {
        match self {
            Self::Interrupted => 1,
            Self::ProviderShutdown => 2,
        }
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Interrupted),
            2 => Some(Self::ProviderShutdown),
            _ => None,
        }
    }

    /// Process exit status for this reason.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Interrupted => 0,
            Self::ProviderShutdown => 1,
        }
    }
}

/// Shared stop flag. Clones refer to the same flag; the first request wins.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    reason: Arc<AtomicU8>,
}

impl Shutdown {
    /// Creates a flag with no stop requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Returns `false` if a stop was already requested.
    ///
    /// Only touches an atomic, so it is safe to call from notification
    /// callbacks and signal handler threads.
    pub fn request(&self, reason: StopReason) -> bool {
        self.reason
            .compare_exchange(0, reason.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns the stop reason, if one has been requested.
    #[must_use]
    pub fn requested(&self) -> Option<StopReason> {
        StopReason::from_code(self.reason.load(Ordering::Acquire))
    }
}
