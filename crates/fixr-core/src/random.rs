//! Injectable randomness for the arena.
//!
//! The sequencer never touches a global generator: every draw goes through a
//! [`RandomSource`] handed in by the caller, so a seeded run replays exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// A uniform sample from `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// A uniform integer in `[low, high]`.
    fn next_in(&mut self, low: usize, high: usize) -> usize {
        let span = high.saturating_sub(low) + 1;
        let offset = (self.next_unit() * span as f64).floor() as usize;
        low + offset.min(span - 1)
    }

    /// Fisher-Yates shuffle driven by this source.
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.next_in(0, i);
            items.swap(i, j);
        }
    }
}

impl RandomSource for ChaCha8Rng {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Deterministic source for a given seed.
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Source seeded from the operating system.
pub fn from_entropy() -> ChaCha8Rng {
    ChaCha8Rng::from_entropy()
}

/// Replays a fixed list of samples, cycling when it runs out.
///
/// Useful for pinning a particular draw, e.g. a fallback amount.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(samples: impl Into<Vec<f64>>) -> Self {
        Self {
            samples: samples.into(),
            cursor: 0,
        }
    }

    /// Number of samples drawn so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        sample.clamp(0.0, 1.0 - f64::EPSILON)
    }
}
