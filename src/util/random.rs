// src/util/random.rs
//! Injectable randomness.
//!
//! Weighted template selection and jittered notification delays draw from a
//! `RandomSource` rather than a global RNG, so tests can pin every outcome
//! (`SeededRandom` for reproducible streams, `SequenceRandom` for scripted
//! ones).

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Mutex;

pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer draw in `[lo, hi)`. Callers guarantee `lo < hi`.
    fn next_u64_in(&mut self, lo: u64, hi: u64) -> u64;
}

/// A `RandomSource` shared across components.
pub type SharedRandom = std::sync::Arc<Mutex<Box<dyn RandomSource>>>;

pub fn shared(source: Box<dyn RandomSource>) -> SharedRandom {
    std::sync::Arc::new(Mutex::new(source))
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn next_u64_in(&mut self, lo: u64, hi: u64) -> u64 {
        rand::thread_rng().gen_range(lo..hi)
    }
}

/// Deterministic source seeded once; same seed, same stream.
#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_u64_in(&mut self, lo: u64, hi: u64) -> u64 {
        self.rng.gen_range(lo..hi)
    }
}

/// Source that replays a fixed list of `[0, 1)` fractions, cycling when
/// exhausted. Lets a test script the exact branch a weighted choice or a
/// probabilistic filter takes.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "SequenceRandom needs at least one value");
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }

    fn next_u64_in(&mut self, lo: u64, hi: u64) -> u64 {
        let f = self.next_f64();
        lo + (f * (hi - lo) as f64) as u64
    }
}

/// Weighted index selection over non-negative weights. Returns `None` when
/// no weight is positive.
pub fn weighted_index(source: &mut dyn RandomSource, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let mut target = source.next_f64() * total;
    let mut last = None;
    for (i, w) in weights.iter().enumerate() {
        if !w.is_finite() || *w <= 0.0 {
            continue;
        }
        last = Some(i);
        if target < *w {
            return Some(i);
        }
        target -= *w;
    }
    // Floating-point underflow on the final subtraction lands here.
    last
}
