//! Simulated clock.
//!
//! Time is a non-negative `f64` measured in hours; it advances only when the
//! scheduler fires an event. Helpers convert the other config units into the
//! canonical hour.

/// Hours per minute.
pub const MINUTE: f64 = 1.0 / 60.0;
/// Hours per second.
pub const SECOND: f64 = 1.0 / 3600.0;
/// Hours per day.
pub const DAY: f64 = 24.0;

/// Converts minutes to hours.
#[inline]
pub fn minutes(m: f64) -> f64 {
    m * MINUTE
}

/// Converts seconds to hours.
#[inline]
pub fn seconds(s: f64) -> f64 {
    s * SECOND
}

/// Monotone simulated clock, one per replication.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: f64,
}

impl Clock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current simulated time in hours.
    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advances the clock. Time never goes backwards.
    pub fn advance_to(&mut self, t: f64) {
        debug_assert!(
            t >= self.now,
            "time cannot go backwards: current={}, target={}",
            self.now,
            t
        );
        self.now = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        assert_eq!(Clock::new().now(), 0.0);
    }

    #[test]
    fn clock_advances() {
        let mut clock = Clock::new();
        clock.advance_to(1.5);
        clock.advance_to(1.5);
        clock.advance_to(2.0);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    #[should_panic(expected = "time cannot go backwards")]
    fn clock_rejects_regression() {
        let mut clock = Clock::new();
        clock.advance_to(5.0);
        clock.advance_to(4.0);
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(minutes(30.0), 0.5);
        assert_eq!(seconds(1800.0), 0.5);
        assert_eq!(DAY, 24.0);
    }
}
