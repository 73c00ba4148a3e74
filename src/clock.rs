//! Timestamp capture for mining attempts
//!
//! A block's timestamp is part of its preimage, so it is taken once at the
//! start of a mining attempt and stored as text.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Arc;

/// Source of mining timestamps
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall clock rendered at a fixed UTC offset, e.g. `1/2/2025, 3:04:05 PM`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// `offset_minutes` east of UTC; out-of-range offsets fall back to UTC
    pub fn new(offset_minutes: i32) -> Self {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn render(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(7 * 60)
    }
}

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        self.render(Utc::now())
    }
}

/// Always returns the same timestamp
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_en_us_style_at_offset() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 8, 4, 5).unwrap();
        assert_eq!(SystemClock::new(7 * 60).render(at), "1/2/2025, 3:04:05 PM");
        assert_eq!(SystemClock::new(0).render(at), "1/2/2025, 8:04:05 AM");
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        let at = Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap();
        assert_eq!(SystemClock::new(100 * 60).render(at), "6/30/2025, 11:59:59 PM");
    }

    #[test]
    fn fixed_clock_is_stable() {
        let c = FixedClock("t0".into());
        assert_eq!(c.timestamp(), c.timestamp());
    }
}
