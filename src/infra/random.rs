//! Random source adapters
//!
//! The allocator draws serials through [`RandomSource`] so tests can supply a
//! deterministic generator and assert exact tracking numbers.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Uniform integer in `low..=high`
    fn next_in_range(&self, low: u32, high: u32) -> u32;
}

/// Production source backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandomSource;

impl RandomSource for ThreadRandomSource {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Reproducible sequence from a fixed seed
#[derive(Debug)]
pub struct SeededRandomSource {
    rng: Mutex<StdRng>,
}

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl RandomSource for SeededRandomSource {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.lock().gen_range(low..=high)
    }
}

/// Always returns the same value, clamped into the requested range.
///
/// ```
/// use shipment_tracker::infra::random::{FixedRandomSource, RandomSource};
///
/// let rng = FixedRandomSource::new(42);
/// assert_eq!(rng.next_in_range(0, 99_999), 42);
/// assert_eq!(rng.next_in_range(10_000_000, 99_999_999), 10_000_000);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedRandomSource {
    value: u32,
}

impl FixedRandomSource {
    pub fn new(value: u32) -> Self {
        Self { value }
    }
}

impl RandomSource for FixedRandomSource {
    fn next_in_range(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.value.clamp(low, high)
    }
}
