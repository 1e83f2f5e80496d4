//! Random Errors
//!
//! Error types for the generator and shuffle bag.

use thiserror::Error;

/// Result type for cinder-random operations
pub type RandomResult<T> = Result<T, RandomError>;

/// Errors that can occur in cinder-random operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RandomError {
    /// Shuffle window does not fit inside the slice
    #[error("Shuffle window {offset}..{offset}+{count} exceeds slice of length {len}")]
    WindowOutOfBounds {
        offset: usize,
        count: usize,
        len: usize,
    },

    /// Shuffle window larger than a 32-bit draw can index
    #[error("Shuffle window of {0} items is too large")]
    WindowTooLarge(usize),
}
