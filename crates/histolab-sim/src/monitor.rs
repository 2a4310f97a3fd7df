//! Level monitors.
//!
//! A level monitor records a step function of simulated time as raw
//! (t, x) samples. Samples are strictly time-ordered; setting the same
//! value again is coalesced, and a second change within the same instant
//! overwrites the previous sample so the series never carries two entries
//! at one timestamp. Downstream KPI computation resamples as needed.

/// A time-stamped numeric level series.
#[derive(Debug, Clone)]
pub struct Monitor {
    name: String,
    value: f64,
    series: Vec<(f64, f64)>,
}

impl Monitor {
    /// Creates a monitor with an initial sample at t = 0.
    pub fn new(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            value: initial,
            series: vec![(0.0, initial)],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current level.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Records a new level at time `t`.
    pub fn set(&mut self, t: f64, v: f64) {
        self.value = v;
        if let Some(last) = self.series.last_mut() {
            if last.1 == v {
                return;
            }
            if last.0 == t {
                last.1 = v;
                // The overwrite may have made the tail redundant.
                let n = self.series.len();
                if n >= 2 && self.series[n - 2].1 == v {
                    self.series.pop();
                }
                return;
            }
        }
        self.series.push((t, v));
    }

    /// Adds `delta` to the current level at time `t`.
    pub fn add(&mut self, t: f64, delta: f64) {
        self.set(t, self.value + delta);
    }

    /// Increments the level by one at time `t`.
    pub fn incr(&mut self, t: f64) {
        self.add(t, 1.0);
    }

    /// Decrements the level by one at time `t`.
    pub fn decr(&mut self, t: f64) {
        self.add(t, -1.0);
    }

    /// The raw series, closed with a final sample at the horizon.
    pub fn finalized(&self, horizon: f64) -> Vec<(f64, f64)> {
        let mut out = self.series.clone();
        match out.last() {
            Some(&(t, _)) if t < horizon => out.push((horizon, self.value)),
            None => out.push((horizon, self.value)),
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_sample_at_zero() {
        let m = Monitor::new("wip", 0.0);
        assert_eq!(m.finalized(10.0), vec![(0.0, 0.0), (10.0, 0.0)]);
    }

    #[test]
    fn identical_values_coalesce() {
        let mut m = Monitor::new("cap", 0.0);
        m.set(1.0, 0.0);
        m.set(2.0, 4.0);
        m.set(2.5, 4.0);
        assert_eq!(m.finalized(3.0), vec![(0.0, 0.0), (2.0, 4.0), (3.0, 4.0)]);
    }

    #[test]
    fn same_instant_overwrites() {
        let mut m = Monitor::new("wip", 0.0);
        m.incr(1.0);
        m.incr(1.0);
        m.decr(1.0);
        assert_eq!(m.value(), 1.0);
        assert_eq!(m.finalized(2.0), vec![(0.0, 0.0), (1.0, 1.0), (2.0, 1.0)]);
    }

    #[test]
    fn same_instant_round_trip_drops_sample() {
        let mut m = Monitor::new("wip", 2.0);
        m.incr(1.0);
        m.decr(1.0);
        assert_eq!(m.finalized(2.0), vec![(0.0, 2.0), (2.0, 2.0)]);
    }

    #[test]
    fn series_is_strictly_time_ordered() {
        let mut m = Monitor::new("x", 0.0);
        for i in 0..50 {
            m.set(f64::from(i) * 0.25, f64::from(i % 7));
        }
        let s = m.finalized(100.0);
        assert!(s.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
