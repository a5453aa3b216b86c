use super::{Pacer, Rate};
use std::time::Duration;

/// Fixed `freq` hits per `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantPacer {
    rate: Rate,
}

impl ConstantPacer {
    pub fn new(rate: Rate) -> Self {
        Self { rate }
    }
}

impl Pacer for ConstantPacer {
    fn pace(&self, elapsed: Duration, hits: u64) -> (Duration, bool) {
        if self.rate.is_invalid() {
            return (Duration::ZERO, true);
        }

        if self.rate.is_unlimited() {
            return (Duration::ZERO, false);
        }

        let per = self.rate.per.whole_nanoseconds() as u128;
        let freq = self.rate.freq as u128;
        let hits = hits as u128;

        let expected = freq * (elapsed.as_nanos() / per);
        if hits < expected {
            // Behind schedule, fire right away.
            return (Duration::ZERO, false);
        }

        let interval = per / freq;
        if interval == 0 {
            // More than one hit per nanosecond.
            return (Duration::ZERO, false);
        }

        if (i64::MAX as u128) / interval < hits {
            return (Duration::ZERO, true);
        }

        let next = (hits + 1) * interval;
        let wait = next.saturating_sub(elapsed.as_nanos());
        (Duration::from_nanos(wait as u64), false)
    }

    fn rate(&self, _elapsed: Duration) -> f64 {
        self.rate.hits_per_sec()
    }
}
