//! JACK transport source.
//!
//! Opens a client on the running JACK server, registers a shutdown
//! notification that stops the broadcast loop, and activates the client.
//! The client has no ports; it exists only to query the transport.

use ::jack::jack_sys as sys;
use ::jack::{AsyncClient, Client, ClientOptions, ClientStatus, NotificationHandler};

use super::{SourceError, TransportSnapshot, TransportSource, TransportState};
use crate::runtime::{Shutdown, StopReason};
use crate::trace::{info, warn};

/// Forwards the server's shutdown callback to the loop's stop flag.
struct ShutdownNotifier {
    shutdown: Shutdown,
}

impl NotificationHandler for ShutdownNotifier {
    unsafe fn shutdown(&mut self, status: ClientStatus, reason: &str) {
        warn!(?status, reason, "JACK server shut the client down");
        let _ = self.shutdown.request(StopReason::ProviderShutdown);
    }
}

/// An activated JACK client used to query the transport.
pub struct JackTransport {
    client: AsyncClient<ShutdownNotifier, ()>,
}

impl JackTransport {
    /// Opens and activates a client named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the server cannot be reached,
    /// or [`SourceError::Activation`] if the client cannot be activated.
    pub fn activate(name: &str, shutdown: &Shutdown) -> Result<Self, SourceError> {
        let (client, status) = Client::new(name, ClientOptions::empty())
            .map_err(|e| SourceError::Unavailable(format!("jack server not running? ({e})")))?;
        info!(name = client.name(), ?status, "opened JACK client");

        let notifier = ShutdownNotifier {
            shutdown: shutdown.clone(),
        };
        let client = client
            .activate_async(notifier, ())
            .map_err(|e| SourceError::Activation(e.to_string()))?;
        info!("JACK client active");

        Ok(Self { client })
    }
}

impl TransportSource for JackTransport {
    fn query(&mut self) -> Result<TransportSnapshot, SourceError> {
        let mut pos = sys::jack_position_t::default();
        // `Transport::query` reports looping and net-starting as rolling.
        // SAFETY: the client stays active for the lifetime of `self` and
        // `pos` is a valid out-pointer.
        let code = unsafe { sys::jack_transport_query(self.client.as_client().raw(), &mut pos) };
        Ok(snapshot_from(code, &pos))
    }
}

/// Builds a snapshot from a raw transport state code and position.
///
/// Bar/beat/tick and tempo stay zeroed unless a timebase master filled
/// them in.
fn snapshot_from(code: sys::jack_transport_state_t, pos: &sys::jack_position_t) -> TransportSnapshot {
    let mut snapshot = TransportSnapshot {
        frame: u64::from(pos.frame),
        frame_rate: pos.frame_rate,
        state: TransportState::from_code(code),
        ..TransportSnapshot::default()
    };
    if pos.valid & sys::JackPositionBBT != 0 {
        snapshot.bar = pos.bar;
        snapshot.beat = pos.beat;
        snapshot.tick = pos.tick;
        snapshot.beats_per_bar = f64::from(pos.beats_per_bar);
        snapshot.ticks_per_beat = pos.ticks_per_beat;
        snapshot.beats_per_minute = pos.beats_per_minute;
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> sys::jack_position_t {
        sys::jack_position_t {
            frame: 96_000,
            frame_rate: 48_000,
            ..sys::jack_position_t::default()
        }
    }

    #[test]
    fn raw_codes_keep_looping_and_unknown() {
        let pos = position();
        assert_eq!(snapshot_from(sys::JackTransportStopped, &pos).state, TransportState::Stopped);
        assert_eq!(snapshot_from(sys::JackTransportRolling, &pos).state, TransportState::Rolling);
        assert_eq!(snapshot_from(sys::JackTransportLooping, &pos).state, TransportState::Looping);
        assert_eq!(snapshot_from(sys::JackTransportStarting, &pos).state, TransportState::Starting);
        assert_eq!(
            snapshot_from(sys::JackTransportNetStarting, &pos).state,
            TransportState::Unknown
        );
    }

    #[test]
    fn looping_line_says_looping() {
        let snapshot = snapshot_from(sys::JackTransportLooping, &position());
        let line = crate::broadcast::render_line(&snapshot, 10_000).unwrap();
        assert!(line.ends_with(" state=looping\n"));

        let snapshot = snapshot_from(sys::JackTransportNetStarting, &position());
        let line = crate::broadcast::render_line(&snapshot, 10_000).unwrap();
        assert!(line.ends_with(" state=unk\n"));
    }

    #[test]
    fn bbt_needs_valid_bit() {
        let mut pos = sys::jack_position_t {
            bar: 3,
            beat: 2,
            tick: 100,
            beats_per_bar: 3.0,
            ticks_per_beat: 960.0,
            beats_per_minute: 96.0,
            ..position()
        };
        let snapshot = snapshot_from(sys::JackTransportRolling, &pos);
        assert_eq!((snapshot.bar, snapshot.beat, snapshot.tick), (0, 0, 0));
        assert_eq!(snapshot.frame, 96_000);
        assert_eq!(snapshot.position_secs(), Some(2.0));

        pos.valid = sys::JackPositionBBT;
        let snapshot = snapshot_from(sys::JackTransportRolling, &pos);
        assert_eq!((snapshot.bar, snapshot.beat, snapshot.tick), (3, 2, 100));
        assert_eq!(snapshot.beats_per_bar, 3.0);
        assert_eq!(snapshot.beats_per_minute, 96.0);
    }
}
