//! # Cinder Crypto
//!
//! Cryptographic primitives implemented from their definitions.
//!
//! ## Components
//!
//! - **BLAKE2**: BLAKE2b and BLAKE2s, keyed or unkeyed, one generic compressor
//! - **ChaCha**: ChaCha20, XChaCha20 and HChaCha20 over one block function
//! - **Poly1305**: one-time MAC and the constant-time [`Tag`]
//! - **AEAD**: ChaCha20-Poly1305 and XChaCha20-Poly1305 with slice, stream
//!   and in-place APIs
//! - **KDF**: PBKDF2 and HKDF over any cloneable hash session
//! - **Password**: generate/validate facade and the `$b2pbkdf2$` stored format
//!
//! ## Security
//!
//! - Tags and password hashes are compared in constant time
//! - AEAD decryption releases no plaintext before the tag verifies
//! - Stream cipher counters fail instead of wrapping
//! - Key-bearing state is zeroed on drop and redacted from `Debug`

pub mod aead;
pub mod blake2;
pub mod chacha;
pub mod errors;
pub mod kdf;
pub mod password;
pub mod poly1305;
pub mod session;

pub use aead::*;
pub use blake2::*;
pub use chacha::*;
pub use errors::*;
pub use kdf::*;
pub use password::*;
pub use poly1305::*;
pub use session::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aead::*;
    pub use crate::blake2::*;
    pub use crate::chacha::*;
    pub use crate::errors::*;
    pub use crate::kdf::*;
    pub use crate::password::*;
    pub use crate::poly1305::*;
    pub use crate::session::*;
}
