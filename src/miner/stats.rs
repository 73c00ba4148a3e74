//! Hashrate tracking for searches in progress

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling window for hashrate calculation
pub struct HashrateTracker {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    started_at: Instant,
    total_hashes: u64,
}

impl HashrateTracker {
    pub fn new(window_secs: u64) -> Self {
        Self {
            samples: VecDeque::with_capacity(64),
            window: Duration::from_secs(window_secs.max(1)),
            started_at: Instant::now(),
            total_hashes: 0,
        }
    }

    /// Record hashes computed
    pub fn record(&mut self, hashes: u64) {
        let now = Instant::now();
        self.total_hashes = self.total_hashes.saturating_add(hashes);
        self.samples.push_back((now, hashes));

        // Clean old samples outside window
        while let Some(&(ts, _)) = self.samples.front() {
            if now.duration_since(ts) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Hashes per second over the window, falling back to the lifetime
    /// average while the window holds a single sample
    pub fn hashrate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let windowed = last.0.duration_since(first.0).as_secs_f64();
        if self.samples.len() >= 2 && windowed >= 0.001 {
            let total: u64 = self.samples.iter().skip(1).map(|(_, h)| h).sum();
            return total as f64 / windowed;
        }
        self.lifetime_hashrate()
    }

    pub fn lifetime_hashrate(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.total_hashes as f64 / elapsed
    }

    /// Total hashes computed lifetime
    pub fn total_hashes(&self) -> u64 {
        self.total_hashes
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_reports_zero() {
        let t = HashrateTracker::new(5);
        assert_eq!(t.hashrate(), 0.0);
        assert_eq!(t.total_hashes(), 0);
    }

    #[test]
    fn totals_accumulate() {
        let mut t = HashrateTracker::new(5);
        t.record(1000);
        std::thread::sleep(Duration::from_millis(5));
        t.record(1000);
        assert_eq!(t.total_hashes(), 2000);
        assert!(t.hashrate() > 0.0);
    }
}
