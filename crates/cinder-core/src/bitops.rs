//! Bit Operations
//!
//! Word-level helpers shared by the hash, cipher, MAC and PRNG code:
//! rotation, bit counting, integer logarithms, binary GCD, the 2^64
//! modular inverse, constant-time equality and word-wise XOR.
//!
//! Nothing here branches on the contents of the buffers passed to
//! [`ct_eq`], [`xor_into`] or [`xor_in_place`].

use core::hint::black_box;

use crate::errors::{CoreError, CoreResult};

// =============================================================================
// ROTATION
// =============================================================================

/// Rotate a 32-bit word left by `n` bits (mod 32)
#[inline(always)]
pub const fn rotl32(x: u32, n: u32) -> u32 {
    x.rotate_left(n)
}

/// Rotate a 32-bit word right by `n` bits (mod 32)
#[inline(always)]
pub const fn rotr32(x: u32, n: u32) -> u32 {
    x.rotate_right(n)
}

/// Rotate a 64-bit word left by `n` bits (mod 64)
#[inline(always)]
pub const fn rotl64(x: u64, n: u32) -> u64 {
    x.rotate_left(n)
}

/// Rotate a 64-bit word right by `n` bits (mod 64)
#[inline(always)]
pub const fn rotr64(x: u64, n: u32) -> u64 {
    x.rotate_right(n)
}

// =============================================================================
// BIT COUNTING
// =============================================================================

/// Number of leading zero bits (32 for zero)
pub const fn leading_zeros32(x: u32) -> u32 {
    x.leading_zeros()
}

/// Number of leading zero bits (64 for zero)
pub const fn leading_zeros64(x: u64) -> u32 {
    x.leading_zeros()
}

/// Number of trailing zero bits (32 for zero)
pub const fn trailing_zeros32(x: u32) -> u32 {
    x.trailing_zeros()
}

/// Number of trailing zero bits (64 for zero)
pub const fn trailing_zeros64(x: u64) -> u32 {
    x.trailing_zeros()
}

/// Hamming weight (population count) of a 32-bit word
pub const fn hamming_weight32(x: u32) -> u32 {
    x.count_ones()
}

/// Hamming weight (population count) of a 64-bit word
pub const fn hamming_weight64(x: u64) -> u32 {
    x.count_ones()
}

// =============================================================================
// INTEGER LOGARITHMS
// =============================================================================

/// Floor of log2(x); zero maps to zero
pub const fn floor_log2(x: u64) -> u32 {
    if x == 0 {
        0
    } else {
        63 - x.leading_zeros()
    }
}

/// Ceiling of log2(x); zero and one map to zero
pub const fn ceil_log2(x: u64) -> u32 {
    if x <= 1 {
        0
    } else {
        64 - (x - 1).leading_zeros()
    }
}

/// True when `x` has exactly one bit set
pub const fn is_power_of_two(x: u64) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

// =============================================================================
// MODULAR ARITHMETIC
// =============================================================================

/// Greatest common divisor using the binary (Stein) algorithm
///
/// `gcd(0, n)` is `n`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    if a == 0 {
        return b;
    }
    if b == 0 {
        return a;
    }

    let shift = (a | b).trailing_zeros();
    a >>= a.trailing_zeros();

    loop {
        b >>= b.trailing_zeros();
        if a > b {
            core::mem::swap(&mut a, &mut b);
        }
        b -= a;
        if b == 0 {
            break;
        }
    }

    a << shift
}

/// Multiplicative inverse of an odd value modulo 2^64
///
/// Newton–Raphson doubling: `x = v` is correct to 3 bits for any odd `v`,
/// and each step `x *= 2 - v*x` doubles the number of correct bits, so five
/// steps reach 96 > 64 bits.
///
/// # Returns
/// `None` for even input (no inverse exists)
pub const fn mod_inverse(v: u64) -> Option<u64> {
    if v & 1 == 0 {
        return None;
    }

    let mut x = v;
    let mut i = 0;
    while i < 5 {
        x = x.wrapping_mul(2u64.wrapping_sub(v.wrapping_mul(x)));
        i += 1;
    }
    Some(x)
}

// =============================================================================
// CONSTANT-TIME COMPARISON AND XOR
// =============================================================================

#[inline(always)]
fn load_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}

/// Constant-time equality over two byte spans
///
/// XOR-accumulates eight bytes at a time across the full common prefix and
/// folds in the length difference, so any length mismatch always compares
/// unequal. There is no early exit; the work done depends only on the
/// lengths, never on where the first differing byte sits.
///
/// # Returns
/// `true` only for byte-identical, equal-length inputs
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().min(b.len());
    let mut acc = (a.len() ^ b.len()) as u64;

    let mut wa = a[..len].chunks_exact(8);
    let mut wb = b[..len].chunks_exact(8);
    for (x, y) in (&mut wa).zip(&mut wb) {
        acc |= load_u64(x) ^ load_u64(y);
    }
    for (x, y) in wa.remainder().iter().zip(wb.remainder()) {
        acc |= u64::from(x ^ y);
    }

    black_box(acc) == 0
}

/// XOR `a` and `b` into `dst`, eight bytes at a time
///
/// # Errors
/// [`CoreError::LengthMismatch`] unless all three buffers have equal length
pub fn xor_into(dst: &mut [u8], a: &[u8], b: &[u8]) -> CoreResult<()> {
    if a.len() != dst.len() {
        return Err(CoreError::LengthMismatch {
            expected: dst.len(),
            got: a.len(),
        });
    }
    if b.len() != dst.len() {
        return Err(CoreError::LengthMismatch {
            expected: dst.len(),
            got: b.len(),
        });
    }

    let mut out = dst.chunks_exact_mut(8);
    let mut wa = a.chunks_exact(8);
    let mut wb = b.chunks_exact(8);
    for ((o, x), y) in (&mut out).zip(&mut wa).zip(&mut wb) {
        o.copy_from_slice(&(load_u64(x) ^ load_u64(y)).to_le_bytes());
    }
    for ((o, x), y) in out
        .into_remainder()
        .iter_mut()
        .zip(wa.remainder())
        .zip(wb.remainder())
    {
        *o = x ^ y;
    }
    Ok(())
}

/// XOR `src` into `dst` in place, eight bytes at a time
///
/// # Errors
/// [`CoreError::LengthMismatch`] if the lengths differ
pub fn xor_in_place(dst: &mut [u8], src: &[u8]) -> CoreResult<()> {
    if src.len() != dst.len() {
        return Err(CoreError::LengthMismatch {
            expected: dst.len(),
            got: src.len(),
        });
    }

    let mut out = dst.chunks_exact_mut(8);
    let mut ws = src.chunks_exact(8);
    for (o, s) in (&mut out).zip(&mut ws) {
        let word = load_u64(o) ^ load_u64(s);
        o.copy_from_slice(&word.to_le_bytes());
    }
    for (o, s) in out.into_remainder().iter_mut().zip(ws.remainder()) {
        *o ^= s;
    }
    Ok(())
}
