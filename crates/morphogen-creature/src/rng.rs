//! RNG trait abstraction for genetic operators
//!
//! Every stochastic operation takes an explicit generator so a seeded
//! `Xoshiro256StarStar` replays a run exactly, while `rand::rng()` still works
//! for throwaway sparks.

/// Random number source used by soup, reproduction and selection
pub trait GeneticRng {
    /// Uniform base in `[0.0, 1.0)`
    fn next_base(&mut self) -> f64;

    /// Uniform index in `low..=high`
    fn index_between(&mut self, low: usize, high: usize) -> usize;

    /// Check if a uniform draw is below the probability threshold
    fn check_probability(&mut self, probability: f64) -> bool {
        self.next_base() < probability
    }

    /// Uniform index in `0..len`; `len` must be non-zero
    fn index_below(&mut self, len: usize) -> usize {
        self.index_between(0, len - 1)
    }
}

// Blanket implementation for any type implementing rand::Rng
impl<T: rand::Rng> GeneticRng for T {
    fn next_base(&mut self) -> f64 {
        rand::Rng::random::<f64>(self)
    }

    fn index_between(&mut self, low: usize, high: usize) -> usize {
        rand::Rng::random_range(self, low..=high)
    }
}
