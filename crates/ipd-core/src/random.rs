//! Seeded randomness for reproducible simulations.
//!
//! A single generator is threaded through noise application, forgiveness
//! overrides, the Random strategy and group shuffling, so a fixed seed
//! reproduces an entire run byte for byte.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The shared pseudo-random source used throughout the core.
pub type SimRng = ChaCha8Rng;

/// Build a generator from an explicit seed. Same seed, same run.
pub fn rng_from_seed(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Build a generator from OS entropy, for interactive use.
pub fn rng_from_entropy() -> SimRng {
    ChaCha8Rng::from_entropy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = rng_from_seed(42);
        let mut b = rng_from_seed(42);
        for _ in 0..100 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = rng_from_seed(1);
        let mut b = rng_from_seed(2);
        let va: Vec<u64> = (0..10).map(|_| a.gen()).collect();
        let vb: Vec<u64> = (0..10).map(|_| b.gen()).collect();
        assert_ne!(va, vb);
    }
}
