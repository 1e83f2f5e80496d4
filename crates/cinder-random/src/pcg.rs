//! FastRandom: PCG32 (XSH-RR)
//!
//! A 64-bit LCG whose output is the old state's high bits, xorshifted and
//! rotated by its top five bits. Fast, reproducible and statistically sound,
//! but NOT cryptographic: use it for shuffles and sampling, never for keys.
//!
//! ## Streams
//!
//! The increment is fixed per generator and always odd. Two generators with
//! the same seed and different streams produce unrelated sequences.
//!
//! ## Jumps
//!
//! `jump(n)` moves the state `n` steps forward (or back, for negative `n`)
//! in O(log n) using the LCG's closed-form composition.

use cinder_core::{rotr32, PCG_DEFAULT_INCREMENT, PCG_MULTIPLIER};
use rand::{Rng, RngCore};

/// PCG32 generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastRandom {
    state: u64,
    increment: u64,
}

impl FastRandom {
    /// Seed a generator on a chosen stream
    ///
    /// # Arguments
    /// * `seed` - Starting point
    /// * `stream` - Sequence selector; only the low 63 bits matter
    pub fn new(seed: u64, stream: u64) -> Self {
        Self::with_increment(seed, (stream << 1) | 1)
    }

    /// Seed a generator on the default stream
    pub fn with_seed(seed: u64) -> Self {
        Self::with_increment(seed, PCG_DEFAULT_INCREMENT)
    }

    /// Non-reproducible generator seeded from the thread RNG
    pub fn from_entropy() -> Self {
        let mut rng = rand::thread_rng();
        Self::new(rng.gen(), rng.gen())
    }

    fn with_increment(seed: u64, increment: u64) -> Self {
        let mut rng = Self {
            state: 0,
            increment,
        };
        rng.step();
        rng.state = rng.state.wrapping_add(seed);
        rng.step();
        rng
    }

    #[inline(always)]
    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.increment);
    }

    /// Current LCG state
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Odd stream increment
    pub fn increment(&self) -> u64 {
        self.increment
    }

    /// Next 32-bit output
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        rotr32(xorshifted, (old >> 59) as u32)
    }

    /// Uniform draw in `[0, range)`, plus the number of rejected draws
    ///
    /// A `range` of 0 stands for 2^32.
    pub(crate) fn bounded_counted(&mut self, range: u32) -> (u32, u32) {
        if range == 0 {
            return (self.next_u32(), 0);
        }

        // Lemire: reject the low products that would over-represent values
        let mut m = self.next_u32() as u64 * range as u64;
        let mut rejected = 0u32;
        if (m as u32) < range {
            let threshold = range.wrapping_neg() % range;
            while (m as u32) < threshold {
                m = self.next_u32() as u64 * range as u64;
                rejected += 1;
            }
        }
        ((m >> 32) as u32, rejected)
    }

    /// Uniform draw in `[0, range)`; a `range` of 0 means the full 32 bits
    pub fn next_bounded(&mut self, range: u32) -> u32 {
        self.bounded_counted(range).0
    }

    /// Uniform draw in `[min(x, y), max(x, y)]`
    ///
    /// Swapped bounds are accepted.
    pub fn next_u32_in(&mut self, x: u32, y: u32) -> u32 {
        let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
        // Full range wraps to 0, which next_bounded reads as 2^32
        let range = hi.wrapping_sub(lo).wrapping_add(1);
        lo.wrapping_add(self.next_bounded(range))
    }

    /// Uniform float in `[0, 1)` with 32 bits of precision
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (1u64 << 32) as f64
    }

    /// Move the generator `delta` steps; negative values rewind
    pub fn jump(&mut self, delta: i64) {
        // The LCG has period 2^64, so a rewind is a forward jump by the
        // two's complement
        let mut remaining = delta as u64;
        let mut cur_mult = PCG_MULTIPLIER;
        let mut cur_plus = self.increment;
        let mut acc_mult = 1u64;
        let mut acc_plus = 0u64;

        while remaining > 0 {
            if remaining & 1 == 1 {
                acc_mult = acc_mult.wrapping_mul(cur_mult);
                acc_plus = acc_plus.wrapping_mul(cur_mult).wrapping_add(cur_plus);
            }
            cur_plus = cur_mult.wrapping_add(1).wrapping_mul(cur_plus);
            cur_mult = cur_mult.wrapping_mul(cur_mult);
            remaining >>= 1;
        }

        self.state = acc_mult.wrapping_mul(self.state).wrapping_add(acc_plus);
    }
}

impl RngCore for FastRandom {
    fn next_u32(&mut self) -> u32 {
        FastRandom::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
