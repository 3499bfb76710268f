//! xorshift64* random number generator
//!
//! A fast deterministic PRNG. One instance drives every random choice in a
//! run: partner pairing, tie-breaking, invention draws and decay.
//!
//! # Determinism
//!
//! Same seed → same sequence → same simulated society. Reproducing a run
//! only requires the configuration and its seed.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use societies_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let die = rng.random_int_inclusive(1, 6);
/// assert!((1..=6).contains(&die));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is replaced by 1 since xorshift cannot leave the zero state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Uniform integer in the closed range [lo, hi]
    ///
    /// # Example
    /// ```
    /// use societies_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// assert_eq!(rng.random_int_inclusive(3, 3), 3);
    /// ```
    pub fn random_int_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        self.range(lo, hi + 1)
    }

    /// Uniform index in [0, len)
    ///
    /// # Panics
    /// Panics if len == 0
    pub fn index(&mut self, len: usize) -> usize {
        self.range(0, len as i64) as usize
    }

    /// Get current RNG state
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    ///
    /// # Example
    /// ```
    /// use societies_core::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let probability = rng.next_f64();
    /// assert!(probability >= 0.0 && probability < 1.0);
    /// ```
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Top 53 bits scaled into [0.0, 1.0)
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniformly pick one element, or `None` for an empty slice
    pub fn choice<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[self.index(items.len())])
        }
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }

    /// Draw `k` distinct elements, in draw order
    ///
    /// Returns every element (in random order) when `k >= items.len()`.
    pub fn sample_without_replacement<T: Copy>(&mut self, items: &[T], k: usize) -> Vec<T> {
        let mut pool = items.to_vec();
        let mut picked = Vec::with_capacity(k.min(pool.len()));
        while picked.len() < k && !pool.is_empty() {
            let idx = self.index(pool.len());
            picked.push(pool.swap_remove(idx));
        }
        picked
    }

    /// Number of successes in `n` independent trials with success probability `p`
    ///
    /// `p` outside [0, 1] is clamped.
    pub fn binomial(&mut self, n: u64, p: f64) -> u64 {
        if p <= 0.0 || n == 0 {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        (0..n).filter(|_| self.next_f64() < p).count() as u64
    }
}
