//! Shared Constants
//!
//! Fixed sizes and parameters shared by every Cinder crate.
//!
//! These constants are the byte-level contracts of the primitives:
//! - Key, nonce and tag lengths for the ChaCha family and Poly1305
//! - Block and digest bounds for BLAKE2b and BLAKE2s
//! - Streaming chunk size
//! - PCG32 generator parameters

// =============================================================================
// SYMMETRIC KEY MATERIAL
// =============================================================================

/// Key size for ChaCha20, XChaCha20 and Poly1305 (256 bits)
pub const KEY_SIZE: usize = 32;

/// ChaCha20 nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;

/// XChaCha20 extended nonce size (192 bits)
pub const XNONCE_SIZE: usize = 24;

/// Poly1305 / AEAD authentication tag size (128 bits)
pub const TAG_SIZE: usize = 16;

/// ChaCha keystream block size in bytes
pub const CHACHA_BLOCK_SIZE: usize = 64;

/// Poly1305 input block size in bytes
pub const POLY1305_BLOCK_SIZE: usize = 16;

// =============================================================================
// BLAKE2
// =============================================================================

/// BLAKE2b block size in bytes
pub const BLAKE2B_BLOCK_SIZE: usize = 128;

/// BLAKE2b maximum digest and key length in bytes
pub const BLAKE2B_MAX_OUTPUT: usize = 64;

/// BLAKE2s block size in bytes
pub const BLAKE2S_BLOCK_SIZE: usize = 64;

/// BLAKE2s maximum digest and key length in bytes
pub const BLAKE2S_MAX_OUTPUT: usize = 32;

// =============================================================================
// STREAMING
// =============================================================================

/// Canonical chunk size for streaming hash and AEAD transforms
pub const STREAM_CHUNK_SIZE: usize = 4096;

// =============================================================================
// PCG32
// =============================================================================

/// PCG 64-bit LCG multiplier
pub const PCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// Default PCG stream increment (odd)
pub const PCG_DEFAULT_INCREMENT: u64 = 1_442_695_040_888_963_407;
