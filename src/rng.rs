use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of the probability rolls used by the fire engine.
pub trait RandomSource: Send {
    /// Returns true with the given probability.
    fn chance(&mut self, probability: f64) -> bool;
}

pub struct SeededRandom {
    inner: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.inner.gen::<f64>() < probability
    }
}

/// Replays queued outcomes, then answers every further roll with `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    outcomes: VecDeque<bool>,
    fallback: bool,
    rolls: Vec<f64>,
}

impl ScriptedRandom {
    pub fn always(outcome: bool) -> Self {
        Self {
            outcomes: VecDeque::new(),
            fallback: outcome,
            rolls: Vec::new(),
        }
    }

    pub fn sequence(outcomes: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            fallback,
            rolls: Vec::new(),
        }
    }

    /// Probabilities asked for so far, in order.
    pub fn rolls(&self) -> &[f64] {
        &self.rolls
    }
}

impl RandomSource for ScriptedRandom {
    fn chance(&mut self, probability: f64) -> bool {
        self.rolls.push(probability);
        self.outcomes.pop_front().unwrap_or(self.fallback)
    }
}
