//! Free-running transport for use without an audio server.
//!
//! Rolls from frame zero at a fixed tempo, deriving the frame counter from
//! the monotonic clock and bar/beat/tick from the frame.

use minstant::Instant;

use super::{SourceError, TransportSnapshot, TransportSource, TransportState};

/// Tempo and timebase of a [`ClockTransport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSettings {
    /// Tempo in beats per minute.
    pub beats_per_minute: f64,
    /// Frames per second.
    pub frame_rate: u32,
    /// Beats in one bar.
    pub beats_per_bar: f64,
    /// Ticks in one beat.
    pub ticks_per_beat: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            beats_per_minute: 120.0,
            frame_rate: 48_000,
            beats_per_bar: 4.0,
            ticks_per_beat: 1920.0,
        }
    }
}

/// A transport that is always rolling.
#[derive(Debug, Clone)]
pub struct ClockTransport {
    settings: ClockSettings,
    origin: Instant,
}

impl ClockTransport {
    /// Starts rolling now.
    #[must_use]
    pub fn start(settings: ClockSettings) -> Self {
        Self {
            settings,
            origin: Instant::now(),
        }
    }

    /// Snapshot for an arbitrary frame position.
    #[must_use]
    pub fn snapshot_at(&self, frame: u64) -> TransportSnapshot {
        let s = &self.settings;
        let beats =
            frame as f64 / f64::from(s.frame_rate) * s.beats_per_minute / 60.0;
        let whole_beats = beats.floor();
        let bars = (whole_beats / s.beats_per_bar).floor();
        let beat_in_bar = whole_beats - bars * s.beats_per_bar;
        let tick = ((beats - whole_beats) * s.ticks_per_beat).floor();

        TransportSnapshot {
            frame,
            frame_rate: s.frame_rate,
            bar: bars as i32 + 1,
            beat: beat_in_bar as i32 + 1,
            tick: tick as i32,
            beats_per_bar: s.beats_per_bar,
            ticks_per_beat: s.ticks_per_beat,
            beats_per_minute: s.beats_per_minute,
            state: TransportState::Rolling,
        }
    }

    fn current_frame(&self) -> u64 {
        (self.origin.elapsed().as_secs_f64() * f64::from(self.settings.frame_rate)) as u64
    }
}

impl TransportSource for ClockTransport {
    fn query(&mut self) -> Result<TransportSnapshot, SourceError> {
        Ok(self.snapshot_at(self.current_frame()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbt(snapshot: &TransportSnapshot) -> (i32, i32, i32) {
        (snapshot.bar, snapshot.beat, snapshot.tick)
    }

    fn clock() -> ClockTransport {
        ClockTransport::start(ClockSettings {
            ticks_per_beat: 960.0,
            ..ClockSettings::default()
        })
    }

    #[test]
    fn starts_at_first_beat() {
        let snapshot = clock().snapshot_at(0);
        assert_eq!(bbt(&snapshot), (1, 1, 0));
        assert_eq!(snapshot.state, TransportState::Rolling);
        assert_eq!(snapshot.frame_rate, 48_000);
    }

    #[test]
    fn half_beat_is_half_the_ticks() {
        // 120 bpm at 48 kHz: one beat every 24000 frames.
        assert_eq!(bbt(&clock().snapshot_at(12_000)), (1, 1, 480));
    }

    #[test]
    fn beats_and_bars_advance() {
        let clock = clock();
        assert_eq!(bbt(&clock.snapshot_at(24_000)), (1, 2, 0));
        assert_eq!(bbt(&clock.snapshot_at(72_000)), (1, 4, 0));
        assert_eq!(bbt(&clock.snapshot_at(96_000)), (2, 1, 0));
        assert_eq!(bbt(&clock.snapshot_at(96_000 * 3 + 36_000)), (4, 2, 480));
    }

    #[test]
    fn query_moves_forward() {
        let mut clock = clock();
        let first = clock.query().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.query().unwrap();
        assert!(second.frame > first.frame);
    }
}
