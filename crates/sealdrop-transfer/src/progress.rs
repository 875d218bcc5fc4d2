//! Pure derived transfer progress: percent and throughput from byte counts.

use std::time::Instant;

/// Accumulates transferred byte counts and derives percent/throughput.
///
/// Elapsed time freezes once the transfer completes, so the reported rate
/// reflects the transfer itself rather than post-completion idle time. No
/// I/O, no locking: one meter per transfer.
#[derive(Debug, Default)]
pub struct TransferMeter {
    started: Option<Instant>,
    finished: Option<Instant>,
    transferred: u64,
    total: u64,
}

impl TransferMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn start(&mut self, total_bytes: u64) {
        self.started = Some(Instant::now());
        self.finished = None;
        self.transferred = 0;
        self.total = total_bytes;
    }

    /// Record `bytes` more transferred. Monotonically increasing; the first
    /// time the total is reached the end time freezes and later calls do not
    /// move it.
    pub fn add_transferred(&mut self, bytes: u64) {
        self.transferred += bytes;

        if self.finished.is_none() && self.total > 0 && self.transferred >= self.total {
            self.finished = Some(Instant::now());
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Progress in percent; 0 when no total is known (never NaN).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.transferred as f64 / self.total as f64 * 100.0
    }

    /// Throughput in bytes per second; 0 before start or when no time has
    /// elapsed yet (never a division by zero).
    pub fn bytes_per_sec(&self) -> f64 {
        let Some(started) = self.started else {
            return 0.0;
        };
        let elapsed = match self.finished {
            Some(end) => end.duration_since(started),
            None => started.elapsed(),
        };

        let secs = elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.transferred as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn percent_reaches_100_only_at_the_end() {
        let mut meter = TransferMeter::new();
        meter.start(1000);

        for expected in [25.0, 50.0, 75.0, 100.0] {
            meter.add_transferred(250);
            assert_eq!(meter.percent(), expected);

            let rate = meter.bytes_per_sec();
            assert!(rate.is_finite() && rate >= 0.0);
        }
        assert_eq!(meter.transferred(), 1000);
    }

    #[test]
    fn zero_elapsed_and_zero_total_yield_zero() {
        let mut meter = TransferMeter::new();
        assert_eq!(meter.bytes_per_sec(), 0.0);
        assert_eq!(meter.percent(), 0.0);

        meter.start(0);
        meter.add_transferred(0);
        assert_eq!(meter.percent(), 0.0);
        assert!(meter.bytes_per_sec().is_finite());
    }

    #[test]
    fn rate_freezes_at_completion() {
        let mut meter = TransferMeter::new();
        meter.start(100);
        sleep(Duration::from_millis(20));
        meter.add_transferred(100);

        let at_completion = meter.bytes_per_sec();
        assert!(at_completion > 0.0);

        // Idle time after completion must not dilute the rate.
        sleep(Duration::from_millis(30));
        assert_eq!(meter.bytes_per_sec(), at_completion);

        // Nor do extra byte reports restart the clock.
        meter.add_transferred(10);
        sleep(Duration::from_millis(10));
        let after_extra = meter.bytes_per_sec();
        assert!(after_extra >= at_completion);
        assert_eq!(meter.transferred(), 110);
    }

    #[test]
    fn running_rate_uses_wall_clock_until_done() {
        let mut meter = TransferMeter::new();
        meter.start(1000);
        sleep(Duration::from_millis(10));
        meter.add_transferred(500);

        let mid = meter.bytes_per_sec();
        assert!(mid > 0.0, "rate should be positive mid-transfer");
        assert!(mid < 500.0 * 1000.0, "10ms elapsed bounds the rate");
    }

    #[test]
    fn reset_returns_to_zero_state() {
        let mut meter = TransferMeter::new();
        meter.start(100);
        meter.add_transferred(100);

        meter.reset();
        assert_eq!(meter.transferred(), 0);
        assert_eq!(meter.total(), 0);
        assert_eq!(meter.percent(), 0.0);
        assert_eq!(meter.bytes_per_sec(), 0.0);
    }
}
