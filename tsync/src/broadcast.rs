//! Best-effort fan-out of transport lines to every target.
//!
//! Each tick the same line goes to every target over its family's shared
//! socket. Sends never block, and a failed send is counted and dropped:
//! the next tick carries a newer sample anyway, so retrying or queueing
//! would only deliver stale positions.

mod line;

pub use line::{
    LineTooLong, MAX_LINE_LEN, ParseLineError, Sample, format_line, parse_line, render_line,
};

use crate::net::Target;
use crate::transport::TransportSnapshot;

/// Outcome of sending one line to all targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Targets the kernel accepted the datagram for.
    pub sent: usize,
    /// Targets whose send failed (would block, unreachable, refused).
    pub failed: usize,
}

/// Owns the target list and the reusable line buffer.
#[derive(Debug)]
pub struct Broadcaster {
    targets: Vec<Target>,
    line: String,
}

impl Broadcaster {
    /// Creates a broadcaster for `targets`.
    #[must_use]
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets,
            line: String::with_capacity(128),
        }
    }

    /// Targets in the order they were given.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The most recently rendered line.
    #[must_use]
    pub fn last_line(&self) -> &str {
        &self.line
    }

    /// Sends `payload` once to every target.
    ///
    /// Never stops early: a failure for one target does not affect the
    /// others.
    pub fn broadcast(&self, payload: &[u8]) -> SendReport {
        self.targets
            .iter()
            .fold(SendReport::default(), |mut report, target| {
                match target.send(payload) {
                    Ok(_) => report.sent += 1,
                    Err(_) => report.failed += 1,
                }
                report
            })
    }

    /// Renders `snapshot` and broadcasts it.
    ///
    /// # Errors
    ///
    /// Returns [`LineTooLong`] without sending anything if the rendered
    /// line exceeds [`MAX_LINE_LEN`].
    pub fn publish(
        &mut self,
        snapshot: &TransportSnapshot,
        period_micros: u64,
    ) -> Result<SendReport, LineTooLong> {
        format_line(snapshot, period_micros, &mut self.line)?;
        Ok(self.broadcast(self.line.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::net::{SocketPool, TargetAddr, UdpSocket};
    use crate::transport::TransportState;

    fn receiver() -> (UdpSocket, TargetAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = TargetAddr::from(socket.local_addr().unwrap());
        (socket, addr)
    }

    fn recv_line(socket: &UdpSocket) -> String {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut buf = [0u8; 2048];
        loop {
            if let Some((n, _)) = socket.try_recv_from(&mut buf).unwrap() {
                return String::from_utf8(buf[..n].to_vec()).unwrap();
            }
            assert!(Instant::now() < deadline, "no datagram received");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn refused_target(pool: &mut SocketPool) -> Target {
        let addr = "255.255.255.255:9".parse::<SocketAddr>().unwrap();
        pool.target(TargetAddr::from(addr)).unwrap()
    }

    fn snapshot() -> TransportSnapshot {
        TransportSnapshot {
            frame: 48_000,
            frame_rate: 48_000,
            bar: 1,
            beat: 3,
            tick: 0,
            beats_per_bar: 4.0,
            ticks_per_beat: 1920.0,
            beats_per_minute: 120.0,
            state: TransportState::Rolling,
        }
    }

    #[test]
    fn every_target_gets_the_same_line() {
        let mut pool = SocketPool::new();
        let (rx_a, addr_a) = receiver();
        let (rx_b, addr_b) = receiver();
        let mut broadcaster = Broadcaster::new(vec![
            pool.target(addr_a).unwrap(),
            pool.target(addr_b).unwrap(),
        ]);

        let report = broadcaster.publish(&snapshot(), 10_000).unwrap();
        assert_eq!(report, SendReport { sent: 2, failed: 0 });

        let expected = broadcaster.last_line().to_owned();
        assert_eq!(recv_line(&rx_a), expected);
        assert_eq!(recv_line(&rx_b), expected);
    }

    #[test]
    fn failed_target_does_not_stop_the_rest() {
        let mut pool = SocketPool::new();
        let (rx, addr) = receiver();
        let broadcaster =
            Broadcaster::new(vec![refused_target(&mut pool), pool.target(addr).unwrap()]);

        for tick in 0..3 {
            let payload = format!("tick={tick}\n");
            let report = broadcaster.broadcast(payload.as_bytes());
            assert_eq!(report, SendReport { sent: 1, failed: 1 });
            assert_eq!(recv_line(&rx), payload);
        }
    }

    #[test]
    fn oversize_line_sends_nothing() {
        let mut pool = SocketPool::new();
        let (rx, addr) = receiver();
        let mut broadcaster = Broadcaster::new(vec![pool.target(addr).unwrap()]);

        let huge = TransportSnapshot {
            frame: u64::MAX,
            bar: i32::MIN,
            beat: i32::MIN,
            tick: i32::MIN,
            beats_per_bar: f64::MAX,
            ticks_per_beat: f64::MAX,
            beats_per_minute: f64::MAX,
            ..snapshot()
        };
        assert!(broadcaster.publish(&huge, u64::MAX).is_err());

        let mut buf = [0u8; 16];
        std::thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv_from(&mut buf).unwrap().is_none());
    }

    #[test]
    fn no_targets_is_a_no_op() {
        let broadcaster = Broadcaster::new(Vec::new());
        assert_eq!(broadcaster.broadcast(b"x\n"), SendReport::default());
    }
}
