//! Request pacing
//!
//! A [`Pacer`] maps the time elapsed since the start of an attack and the number of hits issued
//! so far to the wait before the next hit. Pacers are pure and stateless so the same instance can
//! be queried from anywhere.
mod constant;
mod ramp;

pub use constant::ConstantPacer;
pub use ramp::RampUpPacer;

use chainload_core::{Config, PacerType};
use std::time::Duration;

pub trait Pacer: Send + Sync {
    /// Returns the wait before the next hit, and whether the attack should stop.
    fn pace(&self, elapsed: Duration, hits: u64) -> (Duration, bool);

    /// Instantaneous hits per second at `elapsed`.
    fn rate(&self, elapsed: Duration) -> f64;
}

/// `freq` hits every `per`.
///
/// Both fields are signed so that a malformed configuration can be represented and rejected by
/// the pacer itself (it stops the attack) instead of being silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub freq: i64,
    pub per: time::Duration,
}

impl Rate {
    pub fn new(freq: i64, per: time::Duration) -> Self {
        Self { freq, per }
    }

    pub fn per_second(freq: i64) -> Self {
        Self::new(freq, time::Duration::SECOND)
    }

    /// Zero frequency or zero period means "as fast as possible".
    pub fn is_unlimited(&self) -> bool {
        self.freq == 0 || self.per.is_zero()
    }

    pub fn is_invalid(&self) -> bool {
        self.freq < 0 || self.per.is_negative()
    }

    pub fn hits_per_sec(&self) -> f64 {
        self.freq as f64 / self.per.as_seconds_f64()
    }
}

/// Builds the pacer selected by the run configuration.
pub fn pacer_for(kind: PacerType, config: &Config) -> Box<dyn Pacer> {
    let rate = Rate::per_second(config.tps.min(i64::MAX as u64) as i64);
    match kind {
        PacerType::Constant => Box::new(ConstantPacer::new(rate)),
        PacerType::Linear => Box::new(RampUpPacer::new(rate, config.ramp_up_time)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays an attack loop in virtual time and returns the number of hits issued.
    pub(crate) fn simulate(pacer: &dyn Pacer, duration: Duration) -> u64 {
        let mut elapsed = Duration::ZERO;
        let mut hits = 0;
        loop {
            if elapsed >= duration {
                break hits;
            }
            let (wait, stop) = pacer.pace(elapsed, hits);
            if stop {
                break hits;
            }
            elapsed += wait;
            if elapsed >= duration {
                break hits;
            }
            hits += 1;
        }
    }

    #[test]
    fn invalid_rates_always_stop() {
        let rates = [
            Rate::per_second(-1),
            Rate::new(10, time::Duration::seconds(-1)),
            Rate::new(0, time::Duration::seconds(-1)),
            Rate::new(-5, time::Duration::ZERO),
        ];
        for rate in rates {
            for pacer in [
                Box::new(ConstantPacer::new(rate)) as Box<dyn Pacer>,
                Box::new(RampUpPacer::new(rate, Duration::from_secs(2))),
            ] {
                for hits in [0, 1, 1_000] {
                    assert_eq!(
                        pacer.pace(Duration::from_millis(hits), hits),
                        (Duration::ZERO, true)
                    );
                }
            }
        }
    }

    #[test]
    fn zero_rates_are_unlimited() {
        for rate in [Rate::per_second(0), Rate::new(10, time::Duration::ZERO)] {
            let constant = ConstantPacer::new(rate);
            let ramp = RampUpPacer::new(rate, Duration::from_secs(3));
            for hits in [0, 10, u64::MAX] {
                assert_eq!(constant.pace(Duration::ZERO, hits), (Duration::ZERO, false));
                assert_eq!(ramp.pace(Duration::ZERO, hits), (Duration::ZERO, false));
            }
        }
    }

    #[test]
    fn pacer_for_config() {
        let config = Config {
            tps: 100,
            ramp_up_time: Duration::from_secs(2),
            ..Default::default()
        };
        let constant = pacer_for(PacerType::Constant, &config);
        let linear = pacer_for(PacerType::Linear, &config);
        assert_eq!(constant.rate(Duration::ZERO), 100.);
        assert_eq!(linear.rate(Duration::ZERO), 1.);
        assert_eq!(linear.rate(Duration::from_secs(5)), 100.);
    }

    #[test]
    fn simulated_runs_never_outgrow_the_target_buffer() {
        let cases = [
            (100, 4, 2),
            (100, 4, 0),
            (1, 10, 3),
            (7, 9, 9),
            (250, 3, 1),
            (1_000, 2, 1),
        ];
        for (tps, secs, ramp) in cases {
            let duration = Duration::from_secs(secs);
            let pacer = RampUpPacer::new(Rate::per_second(tps), Duration::from_secs(ramp));
            let hits = simulate(&pacer, duration);
            let buffer = tps as u64 * secs;
            assert!(
                hits <= buffer,
                "tps={tps} duration={secs} ramp={ramp}: {hits} hits > {buffer} targets"
            );
            assert!(
                hits as f64 >= pacer.expected_hits(duration) - 2.,
                "tps={tps} duration={secs} ramp={ramp}: only {hits} hits"
            );
        }
    }
}
