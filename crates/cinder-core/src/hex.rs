//! Hex Codec
//!
//! Byte ↔ hex-string conversion backed by two lookup tables built at
//! compile time: one maps a byte to its two-character pair, the other maps
//! an ASCII character to its nibble value.
//!
//! Encoding always emits lowercase. Decoding accepts either case and
//! requires an even number of characters; the empty string decodes to an
//! empty byte vector.

use crate::errors::{CoreError, CoreResult};

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Marker for characters outside `[0-9a-fA-F]`
const INVALID: u8 = 0xff;

const fn build_pairs() -> [[u8; 2]; 256] {
    let mut table = [[0u8; 2]; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = [DIGITS[i >> 4], DIGITS[i & 0x0f]];
        i += 1;
    }
    table
}

const fn build_nibbles() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as u8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as u8;
        table[b'A' as usize + i] = 10 + i as u8;
        i += 1;
    }
    table
}

static PAIRS: [[u8; 2]; 256] = build_pairs();
static NIBBLES: [u8; 256] = build_nibbles();

// =============================================================================
// ENCODE
// =============================================================================

/// Encode bytes as a lowercase hex string
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    encode_to(bytes, &mut out);
    out
}

/// Append the lowercase hex encoding of `bytes` to `out`
pub fn encode_to(bytes: &[u8], out: &mut String) {
    out.reserve(bytes.len() * 2);
    for &b in bytes {
        let [hi, lo] = PAIRS[b as usize];
        out.push(hi as char);
        out.push(lo as char);
    }
}

// =============================================================================
// DECODE
// =============================================================================

fn nibble(text: &str, index: usize) -> CoreResult<u8> {
    let value = NIBBLES[text.as_bytes()[index] as usize];
    if value == INVALID {
        let character = text
            .get(index..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\u{fffd}');
        return Err(CoreError::InvalidHexCharacter { character, index });
    }
    Ok(value)
}

/// Decode a hex string (either case) into bytes
///
/// # Errors
/// - [`CoreError::OddHexLength`] for an odd number of characters
/// - [`CoreError::InvalidHexCharacter`] for anything outside `[0-9a-fA-F]`
pub fn decode(text: &str) -> CoreResult<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(CoreError::OddHexLength(text.len()));
    }
    let mut out = vec![0u8; text.len() / 2];
    decode_to_slice(text, &mut out)?;
    Ok(out)
}

/// Decode a hex string into a caller-provided buffer of exactly half its length
///
/// # Errors
/// - [`CoreError::OddHexLength`] for an odd number of characters
/// - [`CoreError::LengthMismatch`] if `out` is not `text.len() / 2` bytes
/// - [`CoreError::InvalidHexCharacter`] for anything outside `[0-9a-fA-F]`
pub fn decode_to_slice(text: &str, out: &mut [u8]) -> CoreResult<()> {
    if text.len() % 2 != 0 {
        return Err(CoreError::OddHexLength(text.len()));
    }
    if out.len() != text.len() / 2 {
        return Err(CoreError::LengthMismatch {
            expected: text.len() / 2,
            got: out.len(),
        });
    }

    for (i, byte) in out.iter_mut().enumerate() {
        let hi = nibble(text, 2 * i)?;
        let lo = nibble(text, 2 * i + 1)?;
        *byte = (hi << 4) | lo;
    }
    Ok(())
}
