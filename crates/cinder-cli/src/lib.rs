//! # Cinder CLI
//!
//! Command-line front end for the Cinder primitives.
//!
//! ## Commands
//!
//! - `hash`: BLAKE2b/BLAKE2s digests and MACs
//! - `encrypt` / `decrypt`: streamed ChaCha20-Poly1305 or XChaCha20-Poly1305
//! - `password hash` / `password verify`: salted PBKDF2 account hashes
//! - `derive`: PBKDF2 and HKDF key material
//! - `shuffle`: reproducible ShuffleBag draws
//! - `generate-config`: default TOML configuration

pub mod commands;
pub mod config;
pub mod errors;

pub use commands::*;
pub use config::*;
pub use errors::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::commands::*;
    pub use crate::config::*;
    pub use crate::errors::*;
}
