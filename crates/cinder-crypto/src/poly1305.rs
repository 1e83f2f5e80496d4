//! Poly1305 One-Time MAC
//!
//! Evaluates the message as a polynomial in `r` modulo 2^130 - 5 and adds
//! `s`. The accumulator is five 26-bit limbs so every partial product fits
//! in a u64; the `5r` trick folds the bits above 2^130 back in.
//!
//! A key must authenticate exactly one message.

use std::fmt;

use cinder_core::{ct_eq, hex, KEY_SIZE, POLY1305_BLOCK_SIZE, TAG_SIZE};
use zeroize::Zeroize;

use crate::errors::{CryptoError, CryptoResult};
use crate::session::HashSession;

const LIMB_MASK: u32 = 0x3ff_ffff;

/// Bit 128 of a full block, as seen from the top limb
const HIBIT: u32 = 1 << 24;

// =============================================================================
// TAG
// =============================================================================

/// 16-byte authentication tag
///
/// Equality is constant time.
#[derive(Clone, Copy)]
pub struct Tag([u8; TAG_SIZE]);

impl Tag {
    /// Wrap raw tag bytes
    pub fn new(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a tag from a slice of exactly 16 bytes
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; TAG_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidTagLength {
                expected: TAG_SIZE,
                got: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Raw tag bytes
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }

    /// Lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        ct_eq(&self.0, &other.0)
    }
}

impl Eq for Tag {}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; TAG_SIZE]> for Tag {
    fn from(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.to_hex())
    }
}

// =============================================================================
// MAC
// =============================================================================

#[inline(always)]
fn le32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Poly1305 session
pub struct Poly1305 {
    r: [u32; 5],
    s: [u8; 16],
    h: [u32; 5],
    buf: [u8; POLY1305_BLOCK_SIZE],
    buf_len: usize,
}

impl Poly1305 {
    /// Create a session from a 32-byte one-time key (`r ‖ s`)
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                got: key.len(),
            });
        }

        // Clamp r while splitting it into limbs
        let r = [
            le32(&key[0..]) & 0x3ff_ffff,
            (le32(&key[3..]) >> 2) & 0x3ff_ff03,
            (le32(&key[6..]) >> 4) & 0x3ff_c0ff,
            (le32(&key[9..]) >> 6) & 0x3f0_3fff,
            (le32(&key[12..]) >> 8) & 0x00f_ffff,
        ];
        let mut s = [0u8; 16];
        s.copy_from_slice(&key[16..]);

        Ok(Self {
            r,
            s,
            h: [0; 5],
            buf: [0u8; POLY1305_BLOCK_SIZE],
            buf_len: 0,
        })
    }

    /// One-shot MAC
    pub fn mac(key: &[u8], message: &[u8]) -> CryptoResult<Tag> {
        let mut session = Self::new(key)?;
        session.update(message);
        Ok(session.finalize())
    }

    fn block(&mut self, m: &[u8], hibit: u32) {
        let [r0, r1, r2, r3, r4] = self.r.map(u64::from);
        let (s1, s2, s3, s4) = (r1 * 5, r2 * 5, r3 * 5, r4 * 5);

        let h = &mut self.h;
        h[0] = h[0].wrapping_add(le32(&m[0..]) & LIMB_MASK);
        h[1] = h[1].wrapping_add((le32(&m[3..]) >> 2) & LIMB_MASK);
        h[2] = h[2].wrapping_add((le32(&m[6..]) >> 4) & LIMB_MASK);
        h[3] = h[3].wrapping_add((le32(&m[9..]) >> 6) & LIMB_MASK);
        h[4] = h[4].wrapping_add((le32(&m[12..]) >> 8) | hibit);

        let [h0, h1, h2, h3, h4] = h.map(u64::from);

        let d0 = h0 * r0 + h1 * s4 + h2 * s3 + h3 * s2 + h4 * s1;
        let mut d1 = h0 * r1 + h1 * r0 + h2 * s4 + h3 * s3 + h4 * s2;
        let mut d2 = h0 * r2 + h1 * r1 + h2 * r0 + h3 * s4 + h4 * s3;
        let mut d3 = h0 * r3 + h1 * r2 + h2 * r1 + h3 * r0 + h4 * s4;
        let mut d4 = h0 * r4 + h1 * r3 + h2 * r2 + h3 * r1 + h4 * r0;

        let mask = LIMB_MASK as u64;
        d1 += d0 >> 26;
        d2 += d1 >> 26;
        d3 += d2 >> 26;
        d4 += d3 >> 26;
        let mut t0 = (d0 & mask) + (d4 >> 26) * 5;
        let t1 = (d1 & mask) + (t0 >> 26);
        t0 &= mask;

        h[0] = t0 as u32;
        h[1] = t1 as u32;
        h[2] = (d2 & mask) as u32;
        h[3] = (d3 & mask) as u32;
        h[4] = (d4 & mask) as u32;
    }

    /// Absorb more message bytes
    pub fn update(&mut self, mut data: &[u8]) {
        if self.buf_len > 0 {
            let take = (POLY1305_BLOCK_SIZE - self.buf_len).min(data.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];
            if self.buf_len < POLY1305_BLOCK_SIZE {
                return;
            }
            let block = self.buf;
            self.block(&block, HIBIT);
            self.buf_len = 0;
        }

        let mut blocks = data.chunks_exact(POLY1305_BLOCK_SIZE);
        for block in &mut blocks {
            self.block(block, HIBIT);
        }

        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_len = rest.len();
    }

    /// Finish and return the tag
    pub fn finalize(mut self) -> Tag {
        if self.buf_len > 0 {
            // Partial block: 0x01 terminator, no bit 128
            let mut block = [0u8; POLY1305_BLOCK_SIZE];
            block[..self.buf_len].copy_from_slice(&self.buf[..self.buf_len]);
            block[self.buf_len] = 1;
            self.block(&block, 0);
            block.zeroize();
        }

        let [mut h0, mut h1, mut h2, mut h3, mut h4] = self.h;

        // Fully carry
        h2 += h1 >> 26;
        h1 &= LIMB_MASK;
        h3 += h2 >> 26;
        h2 &= LIMB_MASK;
        h4 += h3 >> 26;
        h3 &= LIMB_MASK;
        h0 += (h4 >> 26) * 5;
        h4 &= LIMB_MASK;
        h1 += h0 >> 26;
        h0 &= LIMB_MASK;

        // g = h + 5 - 2^130
        let mut g0 = h0.wrapping_add(5);
        let mut g1 = h1.wrapping_add(g0 >> 26);
        g0 &= LIMB_MASK;
        let mut g2 = h2.wrapping_add(g1 >> 26);
        g1 &= LIMB_MASK;
        let mut g3 = h3.wrapping_add(g2 >> 26);
        g2 &= LIMB_MASK;
        let mut g4 = h4.wrapping_add(g3 >> 26).wrapping_sub(1 << 26);
        g3 &= LIMB_MASK;

        // Select g when h >= p, without branching
        let select_g = (g4 >> 31).wrapping_sub(1);
        g0 &= select_g;
        g1 &= select_g;
        g2 &= select_g;
        g3 &= select_g;
        g4 &= select_g;
        let keep_h = !select_g;
        h0 = (h0 & keep_h) | g0;
        h1 = (h1 & keep_h) | g1;
        h2 = (h2 & keep_h) | g2;
        h3 = (h3 & keep_h) | g3;
        h4 = (h4 & keep_h) | g4;

        let acc = (h0 as u128)
            | ((h1 as u128) << 26)
            | ((h2 as u128) << 52)
            | ((h3 as u128) << 78)
            | ((h4 as u128) << 104);
        let tag = acc.wrapping_add(u128::from_le_bytes(self.s));

        Tag(tag.to_le_bytes())
    }
}

impl HashSession for Poly1305 {
    fn output_len(&self) -> usize {
        TAG_SIZE
    }

    fn ingest(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        Poly1305::finalize(self).as_bytes().to_vec()
    }
}

impl Drop for Poly1305 {
    fn drop(&mut self) {
        self.r.zeroize();
        self.s.zeroize();
        self.h.zeroize();
        self.buf.zeroize();
    }
}

impl fmt::Debug for Poly1305 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poly1305").field("key", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut key = vec![0u8; 32];
        key[..r.len()].copy_from_slice(r);
        key[16..16 + s.len()].copy_from_slice(s);
        key
    }

    #[test]
    fn test_rfc8439_vector() {
        let key = hex::decode(
            "85d6be7857556d337f4452fe42d506a80103808afb0db2fd4abff6af4149f51b",
        )
        .unwrap();
        let tag = Poly1305::mac(&key, b"Cryptographic Forum Research Group").unwrap();
        assert_eq!(tag.to_hex(), "a8061dc1305136c6c22b8baf0c0127a9");
    }

    #[test]
    fn test_zero_key_gives_zero_tag() {
        let tag = Poly1305::mac(&[0u8; 32], &[0x55u8; 64]).unwrap();
        assert_eq!(tag.as_bytes(), &[0u8; 16]);
    }

    #[test]
    fn test_final_reduction_wraps_modulus() {
        // r = 2, m = 2^128 - 1 as a full block: h = 2 * (2^129 - 1) = p + 3
        let key = key_with(&[2], &[]);
        let tag = Poly1305::mac(&key, &[0xffu8; 16]).unwrap();
        let mut expected = [0u8; 16];
        expected[0] = 3;
        assert_eq!(tag.as_bytes(), &expected);
    }

    #[test]
    fn test_s_addition_wraps_at_128_bits() {
        // r = 2, s = 2^128 - 1, m = 2: h = 2^129 + 4, plus s mod 2^128 = 3
        let key = key_with(&[2], &[0xff; 16]);
        let mut msg = [0u8; 16];
        msg[0] = 2;
        let tag = Poly1305::mac(&key, &msg).unwrap();
        let mut expected = [0u8; 16];
        expected[0] = 3;
        assert_eq!(tag.as_bytes(), &expected);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let key: Vec<u8> = (1u8..=32).collect();
        let msg: Vec<u8> = (0..500).map(|i| (i * 13) as u8).collect();
        let expected = Poly1305::mac(&key, &msg).unwrap();

        for split in [1usize, 3, 15, 16, 17, 33, 250] {
            let mut session = Poly1305::new(&key).unwrap();
            for chunk in msg.chunks(split) {
                session.update(chunk);
            }
            assert_eq!(session.finalize(), expected, "split {split}");
        }
    }

    #[test]
    fn test_partial_block_differs_from_zero_padding() {
        let key: Vec<u8> = (1u8..=32).collect();
        let short = Poly1305::mac(&key, &[1, 2, 3]).unwrap();
        let mut padded_msg = [0u8; 16];
        padded_msg[..3].copy_from_slice(&[1, 2, 3]);
        let padded = Poly1305::mac(&key, &padded_msg).unwrap();
        assert_ne!(short, padded);
    }

    #[test]
    fn test_key_length() {
        assert!(matches!(
            Poly1305::new(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 16 })
        ));
    }

    #[test]
    fn test_tag_from_slice() {
        let tag = Tag::from_slice(&[9u8; 16]).unwrap();
        assert_eq!(tag, Tag::new([9u8; 16]));
        assert_ne!(tag, Tag::new([8u8; 16]));
        assert!(matches!(
            Tag::from_slice(&[0u8; 15]),
            Err(CryptoError::InvalidTagLength { expected: 16, got: 15 })
        ));
        assert_eq!(format!("{:?}", Tag::new([0xab; 16])), format!("Tag({})", "ab".repeat(16)));
    }

    #[test]
    fn test_hash_session_output() {
        let key = [7u8; 32];
        let mut session = Poly1305::new(&key).unwrap();
        HashSession::ingest(&mut session, b"data");
        assert_eq!(session.output_len(), 16);
        let bytes = HashSession::finalize(session);
        assert_eq!(bytes, Poly1305::mac(&key, b"data").unwrap().as_bytes().to_vec());
    }
}
