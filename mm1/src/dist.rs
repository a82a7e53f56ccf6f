//! Exponential samplers for interarrival and service times.
//!
//! Each pipeline task owns its own [`ExpSampler`] with an independently
//! seeded generator, so concurrent draws never contend on a shared source.
//! Streams are derived from one master seed: a fixed seed reproduces a run's
//! sequence of drawn durations, while a different number of streams (for
//! example running without the annotator) does not perturb the statistics.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp;

/// Sampler for durations drawn from an exponential distribution.
#[derive(Clone, Debug)]
pub struct ExpSampler {
    rate: f64,
    rng: StdRng,
    exp: Exp<f64>,
}

impl ExpSampler {
    /// Create a sampler with the given rate (events per second) and seed.
    ///
    /// Returns `None` if `rate` is not strictly positive.
    pub fn new(rate: f64, seed: u64) -> Option<Self> {
        if !(rate > 0.0) {
            return None;
        }
        let exp = Exp::new(rate).ok()?;
        Some(Self {
            rate,
            rng: StdRng::seed_from_u64(seed),
            exp,
        })
    }

    /// Rate parameter of the distribution.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw a duration in seconds.
    pub fn sample_secs(&mut self) -> f64 {
        self.rng.sample(self.exp)
    }

    /// Draw a duration. Draws beyond what a `Duration` can hold saturate
    /// to `Duration::MAX`.
    pub fn sample(&mut self) -> Duration {
        Duration::try_from_secs_f64(self.sample_secs()).unwrap_or(Duration::MAX)
    }
}

/// Derives independent seeds for per-task random streams.
#[derive(Debug)]
pub struct SeedStreams {
    master: u64,
    rng: StdRng,
}

impl SeedStreams {
    /// Derive streams from an explicit master seed.
    pub fn from_seed(master: u64) -> Self {
        Self {
            master,
            rng: StdRng::seed_from_u64(master),
        }
    }

    /// Derive streams from an entropy-seeded master.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::thread_rng().gen())
    }

    /// Derive streams from `seed` if given, entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// The master seed, useful for logging a run so it can be replayed.
    pub fn master(&self) -> u64 {
        self.master
    }

    /// Next per-task seed.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}
