//! # Cinder Random
//!
//! Deterministic, non-cryptographic randomness.
//!
//! ## Components
//!
//! - **FastRandom**: PCG32 (XSH-RR) with streams, O(log n) jumps in both
//!   directions and unbiased bounded draws; plugs into `rand` as an `RngCore`
//! - **ShuffleBag**: in-place partial Fisher–Yates over a slice window that
//!   can be undone exactly
//!
//! Generators are plain values threaded through the code that uses them.
//! There is no process-wide instance.

pub mod errors;
pub mod pcg;
pub mod shuffle;

pub use errors::*;
pub use pcg::*;
pub use shuffle::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::pcg::*;
    pub use crate::shuffle::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_shares_generator_sequence() {
        let mut items = [10u32, 20, 30, 40];
        let mut bag = ShuffleBag::new(&mut items, FastRandom::new(1, 2)).unwrap();
        let first = *bag.draw().unwrap();

        // The first draw swaps slot 3 with a slot picked from a window of 4
        let pick = FastRandom::new(1, 2).next_bounded(4) as usize;
        assert_eq!(first, [10u32, 20, 30, 40][pick]);
    }
}
