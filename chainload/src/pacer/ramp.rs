use super::{ConstantPacer, Pacer, Rate};
use std::time::Duration;

/// Ramps linearly from 1 hit/s up to the goal rate over `ramp_up`, then holds the goal rate.
///
/// The expected number of hits is quadratic in the elapsed time while ramping and linear once the
/// goal rate has been reached. A zero `ramp_up` is exactly a [`ConstantPacer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampUpPacer {
    rate: Rate,
    ramp_up: Duration,
}

impl RampUpPacer {
    pub fn new(rate: Rate, ramp_up: Duration) -> Self {
        Self { rate, ramp_up }
    }

    fn goal(&self) -> f64 {
        self.rate.hits_per_sec()
    }

    // hits/s^2
    fn slope(&self) -> f64 {
        (self.goal() - 1.) / self.ramp_up.as_secs_f64()
    }

    /// Cumulative number of hits the schedule expects by `elapsed`.
    pub fn expected_hits(&self, elapsed: Duration) -> f64 {
        let x = elapsed.as_secs_f64();
        if self.ramp_up.is_zero() {
            return self.goal() * x;
        }

        let t = self.ramp_up.as_secs_f64();
        let a = self.slope();
        if x < t {
            x + a * x * x / 2.
        } else {
            t + a * t * t / 2. + self.goal() * (x - t)
        }
    }
}

impl Pacer for RampUpPacer {
    fn pace(&self, elapsed: Duration, hits: u64) -> (Duration, bool) {
        if self.rate.is_invalid() {
            return (Duration::ZERO, true);
        }

        if self.rate.is_unlimited() {
            return (Duration::ZERO, false);
        }

        if self.ramp_up.is_zero() {
            return ConstantPacer::new(self.rate).pace(elapsed, hits);
        }

        let expected = self.expected_hits(elapsed);
        if (hits as f64) < expected {
            return (Duration::ZERO, false);
        }

        let interval = (1e9 / self.rate(elapsed)).round();
        let nanos = interval as u64;
        if nanos != 0 && (i64::MAX as u64) / nanos < hits {
            return (Duration::ZERO, true);
        }

        let ahead = hits as f64 + 1. - expected;
        (Duration::from_nanos((interval * ahead) as u64), false)
    }

    fn rate(&self, elapsed: Duration) -> f64 {
        if elapsed >= self.ramp_up {
            return self.goal();
        }
        1. + self.slope() * elapsed.as_secs_f64()
    }
}
