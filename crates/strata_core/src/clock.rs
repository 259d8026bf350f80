//! # Tick Clock
//!
//! A monotonically increasing game-tick counter with a fixed nominal rate.
//!
//! The world owns the [`TickClock`] and is the only thing that advances it.
//! Everyone else (the redstone simulator in particular) holds a read-only
//! [`ClockReader`].
//!
//! [`TickLoop`] paces real time against the nominal rate for hosts that run
//! the world live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Owning handle: can advance time.
#[derive(Debug)]
pub struct TickClock {
    ticks: Arc<AtomicU64>,
    rate: u32,
}

impl TickClock {
    /// Creates a clock at tick 0 running at `ticks_per_second`.
    #[must_use]
    pub fn new(ticks_per_second: u32) -> Self {
        Self { ticks: Arc::new(AtomicU64::new(0)), rate: ticks_per_second.max(1) }
    }

    /// Current game tick.
    #[inline]
    #[must_use]
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Advances one game tick and returns the new value.
    #[inline]
    pub fn advance(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Nominal ticks per second.
    #[inline]
    #[must_use]
    pub const fn rate(&self) -> u32 {
        self.rate
    }

    /// A read-only view of this clock.
    #[must_use]
    pub fn reader(&self) -> ClockReader {
        ClockReader { ticks: Arc::clone(&self.ticks), rate: self.rate }
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Read-only view of a [`TickClock`].
#[derive(Clone, Debug)]
pub struct ClockReader {
    ticks: Arc<AtomicU64>,
    rate: u32,
}

impl ClockReader {
    /// Current game tick.
    #[inline]
    #[must_use]
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Nominal ticks per second.
    #[inline]
    #[must_use]
    pub const fn rate(&self) -> u32 {
        self.rate
    }
}

/// Fixed-timestep pacing for a live world.
pub struct TickLoop {
    tick_duration: Duration,
    last_tick: Instant,
    accumulator: Duration,
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (took longer than budget).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self { min_tick_us: u64::MAX, max_tick_us: 0, avg_tick_us: 0, late_ticks: 0, total_ticks: 0 }
    }
}

impl TickLoop {
    /// Creates a tick loop for the given rate.
    #[must_use]
    pub fn new(ticks_per_second: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(ticks_per_second.max(1)));
        Self {
            tick_duration,
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            stats: TickStats { avg_tick_us: tick_duration.as_micros() as u64, ..TickStats::default() },
        }
    }

    /// Returns true if a tick is due. Call in a loop until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;
        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        Instant::now()
    }

    /// Marks the end of a tick and records its duration.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = duration.as_micros() as u64;

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let elapsed = Instant::now().duration_since(self.last_tick);
        if elapsed < self.tick_duration {
            std::thread::sleep(self.tick_duration - elapsed);
        }
    }

    /// Returns tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Returns the target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_monotonic() {
        let clock = TickClock::new(20);
        let reader = clock.reader();
        assert_eq!(reader.now(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(reader.now(), 2);
        assert_eq!(reader.rate(), 20);
    }

    #[test]
    fn test_tick_loop_creation() {
        let tick_loop = TickLoop::new(20);
        assert_eq!(tick_loop.tick_duration(), Duration::from_millis(50));
        assert_eq!(tick_loop.stats().total_ticks, 0);
    }

    #[test]
    fn test_tick_execution() {
        let mut tick_loop = TickLoop::new(1000);
        std::thread::sleep(Duration::from_millis(5));
        assert!(tick_loop.should_tick());

        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);
        assert_eq!(tick_loop.stats().total_ticks, 1);
    }
}
