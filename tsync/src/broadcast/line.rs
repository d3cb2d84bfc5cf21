//! The wire line.
//!
//! Every datagram is one ASCII line of space-separated `key=value` fields:
//!
//! ```text
//! p=10000 f=0 r=48000 bbt=1:1:0 den=4.000000:960.000000 bpm=120.000000 state=rolling
//! ```
//!
//! | Key | Value |
//! |-----|-------|
//! | `p` | sampling period in microseconds |
//! | `f` | frame position |
//! | `r` | frame rate |
//! | `bbt` | `bar:beat:tick` |
//! | `den` | `beats_per_bar:ticks_per_beat` |
//! | `bpm` | tempo |
//! | `state` | `stopped`, `rolling`, `looping`, `starting` or `unk` |
//!
//! Floats carry six fractional digits. The line ends with `\n`; there is no
//! other framing and no sequence number.

use std::fmt::Write as _;

use crate::transport::{TransportSnapshot, TransportState};

/// Longest line that will be put on the wire.
///
/// Realistic snapshots render to well under 200 bytes; only absurd float
/// magnitudes get near this.
pub const MAX_LINE_LEN: usize = 1024;

/// A rendered line exceeded [`MAX_LINE_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rendered line is {len} bytes, limit is {MAX_LINE_LEN}")]
pub struct LineTooLong {
    /// Length the line would have had.
    pub len: usize,
}

/// Renders `snapshot` into `out`, replacing its contents.
///
/// # Errors
///
/// Returns [`LineTooLong`] if the result exceeds [`MAX_LINE_LEN`]. `out`
/// then holds the full oversize line; it is never truncated.
pub fn format_line(
    snapshot: &TransportSnapshot,
    period_micros: u64,
    out: &mut String,
) -> Result<(), LineTooLong> {
    out.clear();
    // fmt::Write for String is infallible.
    let _ = writeln!(
        out,
        "p={} f={} r={} bbt={}:{}:{} den={:.6}:{:.6} bpm={:.6} state={}",
        period_micros,
        snapshot.frame,
        snapshot.frame_rate,
        snapshot.bar,
        snapshot.beat,
        snapshot.tick,
        snapshot.beats_per_bar,
        snapshot.ticks_per_beat,
        snapshot.beats_per_minute,
        snapshot.state.name(),
    );

    if out.len() > MAX_LINE_LEN {
        return Err(LineTooLong { len: out.len() });
    }
    Ok(())
}

/// Convenience wrapper around [`format_line`] returning a new string.
///
/// # Errors
///
/// Returns [`LineTooLong`] if the result exceeds [`MAX_LINE_LEN`].
pub fn render_line(snapshot: &TransportSnapshot, period_micros: u64) -> Result<String, LineTooLong> {
    let mut out = String::with_capacity(128);
    format_line(snapshot, period_micros, &mut out)?;
    Ok(out)
}

/// A decoded line as seen by a receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Sender's sampling period in microseconds.
    pub period_micros: u64,
    /// Transport reading carried by the line.
    pub snapshot: TransportSnapshot,
}

impl Sample {
    /// Playback position in seconds (`f / r`).
    #[must_use]
    pub fn position_secs(&self) -> Option<f64> {
        self.snapshot.position_secs()
    }
}

/// Error decoding a received line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseLineError {
    /// Payload is not ASCII text.
    #[error("line is not ASCII")]
    NotAscii,
    /// A field is not of the form `key=value`.
    #[error("field `{0}` is not key=value")]
    BadField(String),
    /// A required key is absent.
    #[error("missing field `{0}`")]
    Missing(&'static str),
    /// A value could not be parsed.
    #[error("invalid value for `{key}`: `{value}`")]
    BadValue {
        /// Field key.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Decodes one datagram payload.
///
/// Field order is not significant and unknown keys are ignored, so newer
/// senders can add fields without breaking older receivers.
///
/// # Errors
///
/// Returns [`ParseLineError`] if the payload is not ASCII, a field is
/// malformed, or a required field is missing or unparsable.
pub fn parse_line(payload: &[u8]) -> Result<Sample, ParseLineError> {
    if !payload.is_ascii() {
        return Err(ParseLineError::NotAscii);
    }
    // ASCII is valid UTF-8.
    let text = std::str::from_utf8(payload).map_err(|_| ParseLineError::NotAscii)?;

    let mut fields = Fields::default();
    for field in text.split_ascii_whitespace() {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| ParseLineError::BadField(field.to_owned()))?;
        match key {
            "p" => fields.period = Some(value),
            "f" => fields.frame = Some(value),
            "r" => fields.rate = Some(value),
            "bbt" => fields.bbt = Some(value),
            "den" => fields.den = Some(value),
            "bpm" => fields.bpm = Some(value),
            "state" => fields.state = Some(value),
            _ => {}
        }
    }

    let [bar, beat, tick] = split_n::<3>(required("bbt", fields.bbt)?, "bbt")?;
    let [beats_per_bar, ticks_per_beat] = split_n::<2>(required("den", fields.den)?, "den")?;
    let state: TransportState = required("state", fields.state)?
        .parse()
        .unwrap_or_default();

    Ok(Sample {
        period_micros: number("p", required("p", fields.period)?)?,
        snapshot: TransportSnapshot {
            frame: number("f", required("f", fields.frame)?)?,
            frame_rate: number("r", required("r", fields.rate)?)?,
            bar: number("bbt", bar)?,
            beat: number("bbt", beat)?,
            tick: number("bbt", tick)?,
            beats_per_bar: number("den", beats_per_bar)?,
            ticks_per_beat: number("den", ticks_per_beat)?,
            beats_per_minute: number("bpm", required("bpm", fields.bpm)?)?,
            state,
        },
    })
}

#[derive(Default)]
struct Fields<'a> {
    period: Option<&'a str>,
    frame: Option<&'a str>,
    rate: Option<&'a str>,
    bbt: Option<&'a str>,
    den: Option<&'a str>,
    bpm: Option<&'a str>,
    state: Option<&'a str>,
}

fn required<'a>(key: &'static str, value: Option<&'a str>) -> Result<&'a str, ParseLineError> {
    value.ok_or(ParseLineError::Missing(key))
}

fn number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ParseLineError> {
    value.parse().map_err(|_| ParseLineError::BadValue {
        key,
        value: value.to_owned(),
    })
}

fn split_n<'a, const N: usize>(
    value: &'a str,
    key: &'static str,
) -> Result<[&'a str; N], ParseLineError> {
    let bad = || ParseLineError::BadValue {
        key,
        value: value.to_owned(),
    };
    let mut parts = value.split(':');
    let mut out = [""; N];
    for slot in &mut out {
        *slot = parts.next().ok_or_else(bad)?;
    }
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(out)
}
