//! Core Errors
//!
//! Error types for the bit manipulation and hex codec utilities.

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Core utility errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Hex input has an odd number of characters
    #[error("Hex input has odd length {0}")]
    OddHexLength(usize),

    /// Hex input contains a character outside [0-9a-fA-F]
    #[error("Invalid hex character {character:?} at index {index}")]
    InvalidHexCharacter { character: char, index: usize },

    /// Two buffers that must have equal lengths do not
    #[error("Buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}
