//! Frames-per-second bookkeeping for an attached device.
//!
//! Counts frames the device accepted and, once per window, snapshots how
//! many of them were sent during the window that just closed.

use std::time::Duration;

use tokio::time::Instant;

/// Rolling-window counter of frames accepted by the device.
///
/// Created fresh on every device attachment.
#[derive(Debug, Clone)]
pub struct ThroughputCounter {
    /// Frames accepted since attachment.
    total: u64,
    /// Frames accepted in the most recently closed window.
    last_window: u64,
    /// When the current window opened.
    window_start: Instant,
    /// `total` at `window_start`.
    total_at_window_start: u64,
    window: Duration,
}

impl ThroughputCounter {
    /// Counter with a one-second window starting now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now(), Duration::from_secs(1))
    }

    /// Counter with a custom window opening at `start`.
    pub fn starting_at(start: Instant, window: Duration) -> Self {
        Self {
            total: 0,
            last_window: 0,
            window_start: start,
            total_at_window_start: 0,
            window,
        }
    }

    /// Count one accepted frame at `now`.
    ///
    /// The window is rolled first, so a send landing exactly on the
    /// boundary counts toward the new window.
    pub fn record_send_at(&mut self, now: Instant) {
        self.roll_at(now);
        self.total += 1;
    }

    /// Close the current window if it has elapsed at `now`.
    pub fn roll_at(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= self.window {
            self.last_window = self.total - self.total_at_window_start;
            self.window_start = now;
            self.total_at_window_start = self.total;
        }
    }

    /// Zero the per-window figure (capture stopped).
    pub fn clear_rate(&mut self) {
        self.last_window = 0;
        self.window_start = Instant::now();
        self.total_at_window_start = self.total;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Frames accepted in the last closed window; with the default
    /// window this is frames per second.
    pub fn last_window(&self) -> u64 {
        self.last_window
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for ThroughputCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn new_counter_is_zero() {
        let c = ThroughputCounter::new();
        assert_eq!(c.total(), 0);
        assert_eq!(c.last_window(), 0);
        assert_eq!(c.window(), SECOND);
    }

    #[test]
    fn forty_sends_in_one_second() {
        let t0 = Instant::now();
        let mut c = ThroughputCounter::starting_at(t0, SECOND);
        for i in 0..40 {
            c.record_send_at(t0 + Duration::from_millis(25 * i));
        }
        // Window still open.
        assert_eq!(c.last_window(), 0);

        c.roll_at(t0 + SECOND);
        assert_eq!(c.last_window(), 40);
        assert_eq!(c.total(), 40);
    }

    #[test]
    fn boundary_send_counts_toward_next_window() {
        let t0 = Instant::now();
        let mut c = ThroughputCounter::starting_at(t0, SECOND);
        c.record_send_at(t0);
        c.record_send_at(t0 + SECOND);
        assert_eq!(c.last_window(), 1);
        c.roll_at(t0 + SECOND * 2);
        assert_eq!(c.last_window(), 1);
        assert_eq!(c.total(), 2);
    }

    #[test]
    fn idle_window_reports_zero() {
        let t0 = Instant::now();
        let mut c = ThroughputCounter::starting_at(t0, SECOND);
        for i in 0..10 {
            c.record_send_at(t0 + Duration::from_millis(50 * i));
        }
        c.roll_at(t0 + SECOND);
        assert_eq!(c.last_window(), 10);

        // Nothing sent during the next second.
        c.roll_at(t0 + SECOND * 2);
        assert_eq!(c.last_window(), 0);
        assert_eq!(c.total(), 10);
    }

    #[test]
    fn roll_before_window_elapses_is_noop() {
        let t0 = Instant::now();
        let mut c = ThroughputCounter::starting_at(t0, SECOND);
        c.record_send_at(t0);
        c.roll_at(t0 + Duration::from_millis(999));
        assert_eq!(c.last_window(), 0);
    }

    #[test]
    fn clear_rate_keeps_total() {
        let t0 = Instant::now();
        let mut c = ThroughputCounter::starting_at(t0, SECOND);
        for _ in 0..5 {
            c.record_send_at(t0);
        }
        c.roll_at(t0 + SECOND);
        assert_eq!(c.last_window(), 5);

        c.clear_rate();
        assert_eq!(c.last_window(), 0);
        assert_eq!(c.total(), 5);
    }
}
