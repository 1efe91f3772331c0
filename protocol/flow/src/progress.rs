use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::warn;

/// Upper bound on ticks before progress is forced to saturate.
pub const DEFAULT_MAX_TICKS: u32 = 1_000;
pub const FULL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub tick_ms: u64,
    /// Each tick adds `uniform(0, 1) * max_increment`.
    pub max_increment: f64,
    pub start: f64,
    pub max_ticks: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self::new(300, 15.0)
    }
}

impl ProgressConfig {
    pub const DEPOSIT_COMMITMENT: ProgressConfig = ProgressConfig::new(300, 15.0);
    pub const WITHDRAW_PROOF: ProgressConfig = ProgressConfig::new(800, 8.0);
    pub const KEY_GENERATION: ProgressConfig = ProgressConfig::new(200, 15.0);
    pub const KYC_VERIFICATION: ProgressConfig = ProgressConfig::new(200, 15.0);

    pub const fn new(tick_ms: u64, max_increment: f64) -> Self {
        Self {
            tick_ms,
            max_increment,
            start: 0.0,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }

    pub fn starting_at(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Tick period; a zero period is bumped to 1 ms so the interval stays valid.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Advanced(f64),
    Saturated,
}

/// Bounded random walk from `start` to 100. Values never decrease and the
/// walk saturates after at most `max_ticks` steps.
#[derive(Debug)]
pub struct ProgressSimulator<R> {
    config: ProgressConfig,
    value: f64,
    ticks: u32,
    saturated: bool,
    rng: R,
}

impl<R: Rng> ProgressSimulator<R> {
    pub fn new(config: ProgressConfig, rng: R) -> Self {
        let value = if config.start.is_finite() {
            config.start.clamp(0.0, FULL)
        } else {
            0.0
        };
        Self {
            config,
            value,
            ticks: 0,
            saturated: false,
            rng,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn step(&mut self) -> ProgressEvent {
        if self.saturated {
            return ProgressEvent::Saturated;
        }
        self.ticks += 1;
        let increment = self.rng.gen::<f64>() * self.config.max_increment.max(0.0);
        self.value = (self.value + increment).min(FULL);
        if self.value < FULL && self.ticks >= self.config.max_ticks {
            warn!(
                "progress stalled at {:.1} after {} ticks, forcing saturation",
                self.value, self.ticks
            );
            self.value = FULL;
        }
        if self.value >= FULL {
            self.saturated = true;
            ProgressEvent::Saturated
        } else {
            ProgressEvent::Advanced(self.value)
        }
    }

    /// Steps once per tick period, reporting every value including the final
    /// 100. The first step happens one period after the call. Returns the
    /// number of ticks taken.
    pub async fn run<F: FnMut(f64)>(&mut self, mut on_progress: F) -> u32 {
        let period = self.config.tick();
        let mut interval = time::interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            match self.step() {
                ProgressEvent::Advanced(value) => on_progress(value),
                ProgressEvent::Saturated => {
                    on_progress(FULL);
                    return self.ticks;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn zero_draws_hit_the_cutoff() {
        // StepRng(0, 0) always yields zero, so the walk never moves on its own.
        let config = ProgressConfig::new(10, 15.0).with_max_ticks(25);
        let mut sim = ProgressSimulator::new(config, StepRng::new(0, 0));
        for _ in 0..24 {
            assert_eq!(sim.step(), ProgressEvent::Advanced(0.0));
        }
        assert_eq!(sim.step(), ProgressEvent::Saturated);
        assert_eq!(sim.value(), FULL);
        assert_eq!(sim.ticks(), 25);
    }

    #[test]
    fn saturation_is_sticky() {
        let config = ProgressConfig::new(10, 15.0).starting_at(99.999_999);
        let mut sim = ProgressSimulator::new(config, StepRng::new(u64::MAX, 0));
        assert_eq!(sim.step(), ProgressEvent::Saturated);
        let ticks = sim.ticks();
        assert_eq!(sim.step(), ProgressEvent::Saturated);
        assert_eq!(sim.ticks(), ticks);
        assert_eq!(sim.value(), FULL);
    }

    #[test]
    fn start_is_clamped() {
        let sim = ProgressSimulator::new(
            ProgressConfig::default().starting_at(250.0),
            StdRng::seed_from_u64(0),
        );
        assert_eq!(sim.value(), FULL);
        let sim = ProgressSimulator::new(
            ProgressConfig::default().starting_at(f64::NAN),
            StdRng::seed_from_u64(0),
        );
        assert_eq!(sim.value(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_one_period_per_tick() {
        let config = ProgressConfig::DEPOSIT_COMMITMENT;
        let mut sim = ProgressSimulator::new(config, StdRng::seed_from_u64(11));
        let started = Instant::now();
        let mut seen = Vec::new();
        let ticks = sim.run(|value| seen.push(value)).await;

        assert_eq!(seen.len() as u32, ticks);
        assert_eq!(seen.last().copied(), Some(FULL));
        assert_eq!(started.elapsed(), config.tick() * ticks);
    }

    proptest! {
        #[test]
        fn walk_is_monotonic_bounded_and_terminates(
            seed in any::<u64>(),
            max_increment in 0.0f64..30.0,
            start in 0.0f64..100.0,
            max_ticks in 1u32..400,
        ) {
            let config = ProgressConfig::new(1, max_increment)
                .starting_at(start)
                .with_max_ticks(max_ticks);
            let mut sim = ProgressSimulator::new(config, StdRng::seed_from_u64(seed));
            let mut last = sim.value();
            let mut saturated = false;
            for _ in 0..max_ticks {
                match sim.step() {
                    ProgressEvent::Advanced(value) => {
                        prop_assert!(value >= last);
                        prop_assert!(value < FULL);
                        last = value;
                    }
                    ProgressEvent::Saturated => {
                        saturated = true;
                        break;
                    }
                }
            }
            prop_assert!(saturated);
            prop_assert_eq!(sim.value(), FULL);
            prop_assert!(sim.ticks() <= max_ticks);
        }
    }
}
