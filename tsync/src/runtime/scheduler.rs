//! The broadcast loop.
//!
//! One thread, one state. Every iteration checks for a stop request,
//! samples the transport, renders and sends the line, then pauses for the
//! configured period. The pause is not shortened by the time the work took,
//! so the effective period stretches slightly under load.

use std::time::Duration;

use minstant::Instant;

use super::shutdown::{Shutdown, StopReason};
use crate::broadcast::{Broadcaster, SendReport};
use crate::trace::{debug, info, trace};
use crate::transport::{Sampler, TransportSource};

/// Suspends the loop between ticks.
pub trait Pause {
    /// Blocks for `period`.
    fn pause(&mut self, period: Duration);
}

/// [`Pause`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, period: Duration) {
        std::thread::sleep(period);
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// A line was rendered and offered to every target.
    Sent(SendReport),
    /// The provider did not answer; nothing was sent.
    NoSample,
    /// The line exceeded the datagram limit; nothing was sent.
    Oversize,
}

/// Running totals over the life of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Iterations completed.
    pub ticks: u64,
    /// Datagrams accepted by the kernel.
    pub sent: u64,
    /// Datagrams that failed to send.
    pub failed: u64,
    /// Ticks skipped because the provider did not answer.
    pub missed_samples: u64,
    /// Ticks skipped because the line was too long.
    pub oversize: u64,
    /// Longest time spent sampling and sending in one tick.
    pub longest_tick: Duration,
}

impl LoopStats {
    fn record(&mut self, report: TickReport, work: Duration) {
        self.ticks += 1;
        self.longest_tick = self.longest_tick.max(work);
        match report {
            TickReport::Sent(sends) => {
                self.sent += sends.sent as u64;
                self.failed += sends.failed as u64;
            }
            TickReport::NoSample => self.missed_samples += 1,
            TickReport::Oversize => self.oversize += 1,
        }
    }
}

/// Drives sample, broadcast, pause until a stop is requested.
pub struct Scheduler<S, P = ThreadSleep> {
    sampler: Sampler<S>,
    broadcaster: Broadcaster,
    pause: P,
    period: Duration,
    period_micros: u64,
    shutdown: Shutdown,
    stats: LoopStats,
}

impl<S: TransportSource> Scheduler<S> {
    /// Creates a scheduler that sleeps the thread between ticks.
    pub fn new(
        sampler: Sampler<S>,
        broadcaster: Broadcaster,
        period: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self::with_pause(sampler, broadcaster, period, shutdown, ThreadSleep)
    }
}

impl<S: TransportSource, P: Pause> Scheduler<S, P> {
    /// Creates a scheduler with a custom pause.
    pub fn with_pause(
        sampler: Sampler<S>,
        broadcaster: Broadcaster,
        period: Duration,
        shutdown: Shutdown,
        pause: P,
    ) -> Self {
        Self {
            sampler,
            broadcaster,
            pause,
            period,
            period_micros: u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
            shutdown,
            stats: LoopStats::default(),
        }
    }

    /// Runs one sample and broadcast, without pausing.
    pub fn tick(&mut self) -> TickReport {
        let Some(snapshot) = self.sampler.query() else {
            return TickReport::NoSample;
        };
        match self.broadcaster.publish(&snapshot, self.period_micros) {
            Ok(report) => {
                trace!(line = self.broadcaster.last_line().trim_end(), "published");
                TickReport::Sent(report)
            }
            Err(e) => {
                debug!(error = %e, "dropping oversize line");
                TickReport::Oversize
            }
        }
    }

    /// Loops until a stop is requested and returns why.
    ///
    /// The stop flag is checked at the top of every iteration, so a request
    /// made during a pause takes effect when the pause ends.
    pub fn run(&mut self) -> StopReason {
        info!(
            targets = self.broadcaster.targets().len(),
            period_us = self.period_micros,
            "broadcast loop running"
        );

        let reason = loop {
            if let Some(reason) = self.shutdown.requested() {
                break reason;
            }
            let started = Instant::now();
            let report = self.tick();
            self.stats.record(report, started.elapsed());
            self.pause.pause(self.period);
        };

        info!(
            ?reason,
            ticks = self.stats.ticks,
            sent = self.stats.sent,
            failed = self.stats.failed,
            missed_samples = self.stats.missed_samples,
            oversize = self.stats.oversize,
            longest_tick_us = self.stats.longest_tick.as_micros() as u64,
            "broadcast loop stopped"
        );
        reason
    }

    /// Totals so far.
    #[must_use]
    pub const fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// The broadcaster and its targets.
    #[must_use]
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Period in whole microseconds, as reported on the wire.
    #[must_use]
    pub const fn period_micros(&self) -> u64 {
        self.period_micros
    }

    #[cfg(test)]
    pub(crate) const fn pause(&self) -> &P {
        &self.pause
    }

    /// Handle that stops this loop when requested.
    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }
}
