//! # Cinder Core
//!
//! Leaf utilities for the Cinder primitives suite.
//!
//! ## Components
//!
//! - **Bit operations**: rotation, bit counting, integer log2, binary GCD,
//!   2^64 modular inverse
//! - **Constant time**: byte-span equality with no early exit, word-wise XOR
//! - **Hex codec**: table-driven encode/decode
//! - **Constants**: key, nonce, tag, block and PCG parameters shared by the
//!   other crates

pub mod bitops;
pub mod constants;
pub mod errors;
pub mod hex;

pub use bitops::*;
pub use constants::*;
pub use errors::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bitops::*;
    pub use crate::constants::*;
    pub use crate::errors::*;
    pub use crate::hex;
}
