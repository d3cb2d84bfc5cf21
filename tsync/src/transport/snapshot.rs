use std::fmt;
use std::str::FromStr;

/// Transport running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    /// Not moving.
    Stopped,
    /// Playing.
    Rolling,
    /// Playing inside a loop range.
    Looping,
    /// Waiting for slow-sync clients before rolling.
    Starting,
    /// Any state code the provider reports that is not one of the above.
    #[default]
    Unknown,
}

impl TransportState {
    /// Maps a JACK `jack_transport_state_t` value.
    ///
    /// Codes outside the four known states (including `JackTransportNetStarting`)
    /// map to [`TransportState::Unknown`].
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Stopped,
            1 => Self::Rolling,
            2 => Self::Looping,
            3 => Self::Starting,
            _ => Self::Unknown,
        }
    }

    /// Wire name of the state.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Rolling => "rolling",
            Self::Looping => "looping",
            Self::Starting => "starting",
            Self::Unknown => "unk",
        }
    }

    /// Returns `true` while the transport is advancing.
    #[must_use]
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Rolling | Self::Looping)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportState {
    type Err = std::convert::Infallible;

    /// Unrecognised names decode as [`TransportState::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "stopped" => Self::Stopped,
            "rolling" => Self::Rolling,
            "looping" => Self::Looping,
            "starting" => Self::Starting,
            _ => Self::Unknown,
        })
    }
}

/// One reading of the transport, taken fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportSnapshot {
    /// Frame position.
    pub frame: u64,
    /// Sample rate in frames per second.
    pub frame_rate: u32,
    /// Bar, 1-based.
    pub bar: i32,
    /// Beat within the bar, 1-based.
    pub beat: i32,
    /// Tick within the beat, 0-based.
    pub tick: i32,
    /// Time signature numerator.
    pub beats_per_bar: f64,
    /// Tick resolution of a beat.
    pub ticks_per_beat: f64,
    /// Tempo.
    pub beats_per_minute: f64,
    /// Running state.
    pub state: TransportState,
}

impl TransportSnapshot {
    /// Position in seconds, or `None` when the frame rate is unknown.
    #[must_use]
    pub fn position_secs(&self) -> Option<f64> {
        (self.frame_rate > 0).then(|| self.frame as f64 / f64::from(self.frame_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_states() {
        assert_eq!(TransportState::from_code(0), TransportState::Stopped);
        assert_eq!(TransportState::from_code(1), TransportState::Rolling);
        assert_eq!(TransportState::from_code(2), TransportState::Looping);
        assert_eq!(TransportState::from_code(3), TransportState::Starting);
        assert_eq!(TransportState::from_code(4), TransportState::Unknown);
        assert_eq!(TransportState::from_code(u32::MAX), TransportState::Unknown);
    }

    #[test]
    fn names_parse_back() {
        for state in [
            TransportState::Stopped,
            TransportState::Rolling,
            TransportState::Looping,
            TransportState::Starting,
            TransportState::Unknown,
        ] {
            assert_eq!(state.name().parse::<TransportState>(), Ok(state));
        }
        assert_eq!("paused".parse::<TransportState>(), Ok(TransportState::Unknown));
    }

    #[test]
    fn position_needs_frame_rate() {
        let snapshot = TransportSnapshot {
            frame: 96_000,
            frame_rate: 48_000,
            ..TransportSnapshot::default()
        };
        assert_eq!(snapshot.position_secs(), Some(2.0));
        assert_eq!(TransportSnapshot::default().position_secs(), None);
    }
}
