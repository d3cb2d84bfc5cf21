//! Transport state sampling.
//!
//! A [`TransportSource`] is anything that can report the current playback
//! position: the JACK transport (feature `jack`) or the free-running
//! [`ClockTransport`]. The [`Sampler`] wraps a source for the broadcast
//! loop and absorbs its failures.

pub mod clock;
#[cfg(feature = "jack")]
pub mod jack;
mod snapshot;

pub use clock::ClockTransport;
pub use snapshot::{TransportSnapshot, TransportState};

use crate::trace::warn;

/// Error reported by a transport source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The provider could not be reached (server not running, client
    /// could not be opened).
    #[error("transport provider unavailable: {0}")]
    Unavailable(String),
    /// The provider was reached but refused to activate the client.
    #[error("cannot activate transport client: {0}")]
    Activation(String),
    /// A position query failed.
    #[error("transport query failed: {0}")]
    Query(String),
}

/// Provider of transport snapshots.
pub trait TransportSource {
    /// Returns the provider's current transport position and state.
    ///
    /// Must not block for longer than a provider round trip.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Query`] if the provider cannot answer.
    fn query(&mut self) -> Result<TransportSnapshot, SourceError>;
}

impl<S: TransportSource + ?Sized> TransportSource for Box<S> {
    fn query(&mut self) -> Result<TransportSnapshot, SourceError> {
        (**self).query()
    }
}

/// Samples a [`TransportSource`] once per tick.
#[derive(Debug)]
pub struct Sampler<S> {
    source: S,
    failures: u64,
}

impl<S: TransportSource> Sampler<S> {
    /// Wraps `source`.
    pub const fn new(source: S) -> Self {
        Self {
            source,
            failures: 0,
        }
    }

    /// Returns a fresh snapshot, or `None` if the provider failed this tick.
    pub fn query(&mut self) -> Option<TransportSnapshot> {
        match self.source.query() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, failures = self.failures, "transport query failed");
                None
            }
        }
    }

    /// Number of failed queries so far.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    #[cfg(test)]
    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
