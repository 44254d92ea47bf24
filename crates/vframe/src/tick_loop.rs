//! # Physics Tick Loop
//!
//! Fixed-timestep cadence for the physics thread.
//!
//! The loop:
//! - Accumulates wall-clock time and releases one tick per tick duration
//! - Caps catch-up after a stall, dropping the backlog instead of spiralling
//! - Tells the thread how long it may sleep before the next tick is due

use std::time::{Duration, Instant};

/// Ticks run back to back before the remaining backlog is dropped.
pub const MAX_CATCH_UP_TICKS: u32 = 4;

/// Fixed-timestep tick controller.
pub struct TickLoop {
    tick_duration: Duration,
    last_poll: Instant,
    accumulator: Duration,
    tick_count: u64,
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed, in microseconds.
    pub min_tick_us: u64,
    /// Longest tick observed, in microseconds.
    pub max_tick_us: u64,
    /// Rolling average tick, in microseconds.
    pub avg_tick_us: u64,
    /// Ticks that took longer than the tick duration.
    pub late_ticks: u64,
    /// Ticks dropped after a stall.
    pub dropped_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: duration_us(tick_duration),
            late_ticks: 0,
            dropped_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl TickLoop {
    /// Creates a tick loop releasing one tick every `tick_duration`.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            last_poll: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Collects elapsed time and returns how many ticks are due now.
    ///
    /// At most [`MAX_CATCH_UP_TICKS`] are released; older backlog is dropped
    /// and counted.
    pub fn poll(&mut self) -> u32 {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_poll);
        self.last_poll = now;

        let mut due = 0;
        while self.accumulator >= self.tick_duration && due < MAX_CATCH_UP_TICKS {
            self.accumulator -= self.tick_duration;
            due += 1;
        }
        if self.accumulator >= self.tick_duration {
            let dropped = self.accumulator.as_nanos() / self.tick_duration.as_nanos().max(1);
            self.stats.dropped_ticks += u64::try_from(dropped).unwrap_or(u64::MAX);
            self.accumulator = Duration::ZERO;
            tracing::debug!(dropped = %dropped, "physics fell behind, backlog dropped");
        }
        due
    }

    /// Marks the start of a tick. Returns the start time for [`end_tick`](Self::end_tick).
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick and records its duration.
    pub fn end_tick(&mut self, start: Instant) {
        let elapsed = start.elapsed();
        let elapsed_us = duration_us(elapsed);

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(elapsed_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(elapsed_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + elapsed_us) / 16;

        if elapsed > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Time left until the next tick is due.
    #[must_use]
    pub fn until_next_tick(&self) -> Duration {
        let pending = self.accumulator + self.last_poll.elapsed();
        self.tick_duration.saturating_sub(pending)
    }

    /// Ticks started since creation.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

fn duration_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_loop_creation() {
        let tick_loop = TickLoop::new(Duration::from_micros(16_666));
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.tick_duration(), Duration::from_micros(16_666));
        assert!(tick_loop.until_next_tick() <= Duration::from_micros(16_666));
    }

    #[test]
    fn test_ticks_released_after_wait() {
        let mut tick_loop = TickLoop::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(3));

        let due = tick_loop.poll();
        assert!(due >= 1);
        assert!(due <= MAX_CATCH_UP_TICKS);

        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);
        assert_eq!(tick_loop.tick_count(), 1);
        assert_eq!(tick_loop.stats().total_ticks, 1);
    }

    #[test]
    fn test_backlog_dropped_after_stall() {
        let mut tick_loop = TickLoop::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(tick_loop.poll(), MAX_CATCH_UP_TICKS);
        assert!(tick_loop.stats().dropped_ticks > 0);
    }

    #[test]
    fn test_reset_stats() {
        let mut tick_loop = TickLoop::new(Duration::from_millis(1));
        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);
        tick_loop.reset_stats();
        assert_eq!(tick_loop.stats().total_ticks, 0);
        assert_eq!(tick_loop.stats().min_tick_us, u64::MAX);
    }
}
