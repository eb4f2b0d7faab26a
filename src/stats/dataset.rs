//! Random sample supplier
//!
//! Produces the coordinator's dataset. Uses the xoshiro256++ PRNG: seeded
//! suppliers are reproducible, unseeded ones draw their seed from entropy.
//!
//! # Example
//!
//! ```
//! use groupbench::stats::dataset::SampleSupplier;
//!
//! let a = SampleSupplier::new(Some(42)).int_samples(8);
//! let b = SampleSupplier::new(Some(42)).int_samples(8);
//! assert_eq!(a, b);
//! assert!(a.iter().all(|v| (0..=100).contains(v)));
//! ```

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Upper bound of generated samples (exclusive for floats, inclusive for ints)
pub const SAMPLE_MAX: i32 = 100;

pub struct SampleSupplier {
    rng: Xoshiro256PlusPlus,
}

impl SampleSupplier {
    /// Seeded supplier when `seed` is given, entropy-seeded otherwise
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self {
                rng: Xoshiro256PlusPlus::from_entropy(),
            },
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// `count` floats uniform in [0, 100)
    pub fn float_samples(&mut self, count: usize) -> Vec<f64> {
        (0..count)
            .map(|_| self.rng.gen_range(0.0..SAMPLE_MAX as f64))
            .collect()
    }

    /// `count` integers uniform in [0, 100]
    pub fn int_samples(&mut self, count: usize) -> Vec<i32> {
        (0..count).map(|_| self.rng.gen_range(0..=SAMPLE_MAX)).collect()
    }
}
