//! BLAKE2b and BLAKE2s
//!
//! Keyed hash family per RFC 7693. Both variants share one generic
//! compressor; a [`Variant`] supplies the word width, round count,
//! G-function rotations and IV.
//!
//! | Variant | Word | Block | Rounds | Digest / key |
//! |---------|------|-------|--------|--------------|
//! | BLAKE2b | u64  | 128 B | 12     | 1..=64 / 0..=64 |
//! | BLAKE2s | u32  | 64 B  | 10     | 1..=32 / 0..=32 |
//!
//! When keyed, the key zero-padded to a full block is the first block
//! compressed, so the byte counter starts one block ahead of the message.

use std::fmt;
use std::marker::PhantomData;
use std::ops::BitXor;

use cinder_core::{
    BLAKE2B_BLOCK_SIZE, BLAKE2B_MAX_OUTPUT, BLAKE2S_BLOCK_SIZE, BLAKE2S_MAX_OUTPUT,
};
use zeroize::Zeroize;

use crate::errors::{CryptoError, CryptoResult};
use crate::session::HashSession;

// =============================================================================
// WORDS AND VARIANTS
// =============================================================================

/// Machine word the compressor runs on
pub trait Word: Copy + Default + BitXor<Output = Self> + fmt::Debug + Zeroize {
    /// Width in bytes
    const BYTES: usize;
    /// Width in bits
    const BITS: u32;
    /// All bits set (finalization flag)
    const ONES: Self;

    fn add(self, rhs: Self) -> Self;
    fn rotr(self, n: u32) -> Self;
    fn load_le(bytes: &[u8]) -> Self;
    fn store_le(self, out: &mut [u8]);
    /// Low `BITS` bits of `v`
    fn truncate(v: u128) -> Self;
}

macro_rules! impl_word {
    ($t:ty) => {
        impl Word for $t {
            const BYTES: usize = core::mem::size_of::<$t>();
            const BITS: u32 = <$t>::BITS;
            const ONES: Self = <$t>::MAX;

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline(always)]
            fn rotr(self, n: u32) -> Self {
                self.rotate_right(n)
            }

            #[inline(always)]
            fn load_le(bytes: &[u8]) -> Self {
                let mut word = [0u8; core::mem::size_of::<$t>()];
                word.copy_from_slice(bytes);
                <$t>::from_le_bytes(word)
            }

            #[inline(always)]
            fn store_le(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            #[inline(always)]
            fn truncate(v: u128) -> Self {
                v as $t
            }
        }
    };
}

impl_word!(u32);
impl_word!(u64);

/// Parameter set distinguishing BLAKE2b from BLAKE2s
pub trait Variant: Clone + fmt::Debug + Send + Sync + 'static {
    type W: Word;
    /// Human-readable algorithm name
    const NAME: &'static str;
    /// Block length in bytes
    const BLOCK_LEN: usize;
    /// Maximum digest length, also the maximum key length
    const MAX_OUTPUT: usize;
    /// Number of rounds per compression
    const ROUNDS: usize;
    /// G-function right-rotation amounts
    const ROTATIONS: [u32; 4];
    /// Initialization vector
    const IV: [Self::W; 8];
}

/// BLAKE2b parameters
#[derive(Debug, Clone, Copy)]
pub struct Blake2bParams;

impl Variant for Blake2bParams {
    type W = u64;
    const NAME: &'static str = "BLAKE2b";
    const BLOCK_LEN: usize = BLAKE2B_BLOCK_SIZE;
    const MAX_OUTPUT: usize = BLAKE2B_MAX_OUTPUT;
    const ROUNDS: usize = 12;
    const ROTATIONS: [u32; 4] = [32, 24, 16, 63];
    const IV: [u64; 8] = [
        0x6a09e667f3bcc908,
        0xbb67ae8584caa73b,
        0x3c6ef372fe94f82b,
        0xa54ff53a5f1d36f1,
        0x510e527fade682d1,
        0x9b05688c2b3e6c1f,
        0x1f83d9abfb41bd6b,
        0x5be0cd19137e2179,
    ];
}

/// BLAKE2s parameters
#[derive(Debug, Clone, Copy)]
pub struct Blake2sParams;

impl Variant for Blake2sParams {
    type W = u32;
    const NAME: &'static str = "BLAKE2s";
    const BLOCK_LEN: usize = BLAKE2S_BLOCK_SIZE;
    const MAX_OUTPUT: usize = BLAKE2S_MAX_OUTPUT;
    const ROUNDS: usize = 10;
    const ROTATIONS: [u32; 4] = [16, 12, 8, 7];
    const IV: [u32; 8] = [
        0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
        0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
    ];
}

/// BLAKE2b session (64-bit words, up to 64-byte digests)
pub type Blake2b = Blake2<Blake2bParams>;

/// BLAKE2s session (32-bit words, up to 32-byte digests)
pub type Blake2s = Blake2<Blake2sParams>;

/// Message word schedule; BLAKE2b's rounds 10 and 11 reuse rows 0 and 1
const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

/// Largest block of either variant
const MAX_BLOCK: usize = BLAKE2B_BLOCK_SIZE;

// =============================================================================
// COMPRESSION
// =============================================================================

/// Mixing function G over four working words and two message words
#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn g<W: Word>(v: &mut [W; 16], rot: [u32; 4], a: usize, b: usize, c: usize, d: usize, x: W, y: W) {
    v[a] = v[a].add(v[b]).add(x);
    v[d] = (v[d] ^ v[a]).rotr(rot[0]);
    v[c] = v[c].add(v[d]);
    v[b] = (v[b] ^ v[c]).rotr(rot[1]);
    v[a] = v[a].add(v[b]).add(y);
    v[d] = (v[d] ^ v[a]).rotr(rot[2]);
    v[c] = v[c].add(v[d]);
    v[b] = (v[b] ^ v[c]).rotr(rot[3]);
}

/// Compress one block into the running state
fn compress<V: Variant>(h: &mut [V::W; 8], block: &[u8], counter: u128, last: bool) {
    let bytes = <V::W as Word>::BYTES;
    let mut m = [V::W::default(); 16];
    for (i, word) in m.iter_mut().enumerate() {
        *word = V::W::load_le(&block[i * bytes..(i + 1) * bytes]);
    }

    let mut v = [V::W::default(); 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&V::IV);
    v[12] = v[12] ^ V::W::truncate(counter);
    v[13] = v[13] ^ V::W::truncate(counter >> <V::W as Word>::BITS);
    if last {
        v[14] = v[14] ^ V::W::ONES;
    }

    let rot = V::ROTATIONS;
    for round in 0..V::ROUNDS {
        let s = &SIGMA[round % 10];
        // Columns
        g(&mut v, rot, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, rot, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, rot, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, rot, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        // Diagonals
        g(&mut v, rot, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, rot, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, rot, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, rot, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] = h[i] ^ v[i] ^ v[i + 8];
    }

    m.zeroize();
    v.zeroize();
}

// =============================================================================
// SESSION
// =============================================================================

/// Incremental BLAKE2 session
///
/// The final block is always held back in the buffer until more input
/// arrives, so `finalize` can flag it as last.
#[derive(Clone)]
pub struct Blake2<V: Variant> {
    h: [V::W; 8],
    buf: [u8; MAX_BLOCK],
    buf_len: usize,
    counter: u128,
    out_len: usize,
    keyed: bool,
    _variant: PhantomData<V>,
}

impl<V: Variant> Blake2<V> {
    /// Create an unkeyed session
    ///
    /// # Arguments
    /// * `out_len` - Digest length in bytes (1..=64 for b, 1..=32 for s)
    pub fn new(out_len: usize) -> CryptoResult<Self> {
        Self::with_key(&[], out_len)
    }

    /// Create a keyed session (MAC mode)
    ///
    /// # Arguments
    /// * `key` - 0..=64 bytes (b) or 0..=32 bytes (s); empty means unkeyed
    /// * `out_len` - Digest length in bytes
    pub fn with_key(key: &[u8], out_len: usize) -> CryptoResult<Self> {
        if out_len == 0 || out_len > V::MAX_OUTPUT {
            return Err(CryptoError::InvalidOutputLength {
                min: 1,
                max: V::MAX_OUTPUT,
                got: out_len,
            });
        }
        if key.len() > V::MAX_OUTPUT {
            return Err(CryptoError::KeyTooLong {
                max: V::MAX_OUTPUT,
                got: key.len(),
            });
        }

        // Parameter block: digest length, key length, fanout = depth = 1
        let mut h = V::IV;
        let param = 0x0101_0000u128 | ((key.len() as u128) << 8) | out_len as u128;
        h[0] = h[0] ^ V::W::truncate(param);

        let mut session = Self {
            h,
            buf: [0u8; MAX_BLOCK],
            buf_len: 0,
            counter: 0,
            out_len,
            keyed: !key.is_empty(),
            _variant: PhantomData,
        };

        if session.keyed {
            session.buf[..key.len()].copy_from_slice(key);
            session.buf_len = V::BLOCK_LEN;
        }

        Ok(session)
    }

    /// Hash `data` in one shot
    pub fn digest(data: &[u8], out_len: usize) -> CryptoResult<Vec<u8>> {
        let mut session = Self::new(out_len)?;
        session.update(data);
        Ok(session.finalize())
    }

    /// Keyed hash of `data` in one shot
    pub fn keyed_digest(key: &[u8], data: &[u8], out_len: usize) -> CryptoResult<Vec<u8>> {
        let mut session = Self::with_key(key, out_len)?;
        session.update(data);
        Ok(session.finalize())
    }

    /// Algorithm name
    pub fn name(&self) -> &'static str {
        V::NAME
    }

    /// Digest length this session was created with
    pub fn output_len(&self) -> usize {
        self.out_len
    }

    /// Whether the session was created with a key
    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    /// Absorb more input
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.buf_len == V::BLOCK_LEN {
                self.counter = self.counter.wrapping_add(V::BLOCK_LEN as u128);
                compress::<V>(&mut self.h, &self.buf[..V::BLOCK_LEN], self.counter, false);
                self.buf_len = 0;
            }

            let take = (V::BLOCK_LEN - self.buf_len).min(data.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];
        }
    }

    /// Compress the held-back block and write the first `out.len()` digest
    /// bytes; `out` is never longer than `out_len`
    fn finish(&mut self, out: &mut [u8]) {
        self.counter = self.counter.wrapping_add(self.buf_len as u128);
        self.buf[self.buf_len..].fill(0);
        compress::<V>(&mut self.h, &self.buf[..V::BLOCK_LEN], self.counter, true);

        let bytes = <V::W as Word>::BYTES;
        let mut full = [0u8; 8 * 8];
        for (i, word) in self.h.iter().enumerate() {
            word.store_le(&mut full[i * bytes..(i + 1) * bytes]);
        }
        out.copy_from_slice(&full[..out.len()]);
        full.zeroize();
    }

    /// Finish into a caller buffer of exactly `output_len()` bytes
    pub fn finalize_into(mut self, out: &mut [u8]) -> CryptoResult<()> {
        if out.len() != self.out_len {
            return Err(CryptoError::BufferLengthMismatch {
                expected: self.out_len,
                got: out.len(),
            });
        }
        self.finish(out);
        Ok(())
    }

    /// Finish and return the digest
    pub fn finalize(mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.out_len];
        self.finish(&mut out);
        out
    }
}

impl<V: Variant> HashSession for Blake2<V> {
    fn output_len(&self) -> usize {
        self.out_len
    }

    fn ingest(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        Blake2::finalize(self)
    }
}

impl<V: Variant> Drop for Blake2<V> {
    fn drop(&mut self) {
        self.h.zeroize();
        self.buf.zeroize();
    }
}

impl<V: Variant> fmt::Debug for Blake2<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Buffer may still hold the key block
        f.debug_struct(V::NAME)
            .field("out_len", &self.out_len)
            .field("keyed", &self.keyed)
            .field("state", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::hex;

    fn seq(n: usize) -> Vec<u8> {
        (0..n).map(|i| i as u8).collect()
    }

    #[test]
    fn test_blake2b_empty() {
        let digest = Blake2b::digest(b"", 64).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
        );
    }

    #[test]
    fn test_blake2b_abc() {
        let digest = Blake2b::digest(b"abc", 64).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn test_blake2s_empty() {
        let digest = Blake2s::digest(b"", 32).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "69217a3079908094e11121d042354a7c1f55b6482ca1a51e1b250dfd1ed0eef9"
        );
    }

    #[test]
    fn test_blake2s_abc() {
        let digest = Blake2s::digest(b"abc", 32).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "508c5e8c327c14e2e1a72ba34eeb452f37458b209ed63a294d999b4c86675982"
        );
    }

    #[test]
    fn test_blake2b_max_key_and_output() {
        let digest = Blake2b::keyed_digest(&seq(64), b"", 64).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "10ebb67700b1868efb4417987acf4690ae9d972fb7a590c2f02871799aaa4786\
             b5e996e8f0f4eb981fc214b005f42d2ff4233499391653df7aefcbc13fc51568"
        );
    }

    #[test]
    fn test_blake2s_max_key_and_output() {
        let digest = Blake2s::keyed_digest(&seq(32), b"", 32).unwrap();
        assert_eq!(
            hex::encode(&digest),
            "48a8997da407876b3d79c0d92325ad3b89cbb754d86ab71aee047ad345fd2c49"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = seq(1000);
        let expected_b = Blake2b::keyed_digest(b"key", &data, 48).unwrap();
        let expected_s = Blake2s::keyed_digest(b"key", &data, 20).unwrap();

        for split in [1usize, 7, 63, 64, 65, 127, 128, 129, 500] {
            let mut b = Blake2b::with_key(b"key", 48).unwrap();
            let mut s = Blake2s::with_key(b"key", 20).unwrap();
            for chunk in data.chunks(split) {
                b.update(chunk);
                s.update(chunk);
            }
            assert_eq!(b.finalize(), expected_b, "blake2b split {split}");
            assert_eq!(s.finalize(), expected_s, "blake2s split {split}");
        }
    }

    #[test]
    fn test_exact_block_boundary() {
        // A message of exactly one block must be finalized as the last block,
        // not compressed early and followed by an empty block.
        let one_block = seq(128);
        let two_blocks = seq(256);
        let a = Blake2b::digest(&one_block, 64).unwrap();
        let b = Blake2b::digest(&two_blocks, 64).unwrap();
        assert_ne!(a, b);

        let mut split = Blake2b::new(64).unwrap();
        split.update(&one_block[..64]);
        split.update(&one_block[64..]);
        assert_eq!(split.finalize(), a);
    }

    #[test]
    fn test_output_length_is_part_of_parameter_block() {
        // Truncation is not the whole story: a 32-byte digest is not the
        // prefix of the 64-byte digest.
        let long = Blake2b::digest(b"abc", 64).unwrap();
        let short = Blake2b::digest(b"abc", 32).unwrap();
        assert_eq!(short.len(), 32);
        assert_ne!(&long[..32], &short[..]);
    }

    #[test]
    fn test_key_changes_digest() {
        let unkeyed = Blake2s::digest(b"message", 32).unwrap();
        let keyed = Blake2s::keyed_digest(b"k", b"message", 32).unwrap();
        let other = Blake2s::keyed_digest(b"K", b"message", 32).unwrap();
        assert_ne!(unkeyed, keyed);
        assert_ne!(keyed, other);
        // An empty key is the unkeyed mode
        assert_eq!(Blake2s::keyed_digest(b"", b"message", 32).unwrap(), unkeyed);
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(matches!(
            Blake2b::new(0),
            Err(CryptoError::InvalidOutputLength { max: 64, got: 0, .. })
        ));
        assert!(matches!(
            Blake2b::new(65),
            Err(CryptoError::InvalidOutputLength { max: 64, got: 65, .. })
        ));
        assert!(matches!(
            Blake2s::new(33),
            Err(CryptoError::InvalidOutputLength { max: 32, got: 33, .. })
        ));
        assert!(matches!(
            Blake2b::with_key(&[0u8; 65], 64),
            Err(CryptoError::KeyTooLong { max: 64, got: 65 })
        ));
        assert!(matches!(
            Blake2s::with_key(&[0u8; 33], 32),
            Err(CryptoError::KeyTooLong { max: 32, got: 33 })
        ));
    }

    #[test]
    fn test_clone_of_keyed_prototype() {
        let proto = Blake2b::with_key(b"secret", 64).unwrap();
        let mut a = proto.clone();
        let mut b = proto.clone();
        a.update(b"one");
        b.update(b"one");
        assert_eq!(a.finalize(), b.finalize());
        assert_eq!(
            proto.finalize(),
            Blake2b::keyed_digest(b"secret", b"", 64).unwrap()
        );
    }

    #[test]
    fn test_finalize_into_checks_length() {
        let session = Blake2s::new(16).unwrap();
        let mut out = [0u8; 32];
        assert!(matches!(
            session.finalize_into(&mut out),
            Err(CryptoError::BufferLengthMismatch { expected: 16, got: 32 })
        ));
    }

    #[test]
    fn test_finalize_and_finalize_into_agree() {
        for out_len in [1, 20, 64] {
            let mut a = Blake2b::with_key(b"key", out_len).unwrap();
            a.update(b"the quick brown fox");
            let b = a.clone();

            let digest = a.finalize();
            let mut into = vec![0u8; out_len];
            b.finalize_into(&mut into).unwrap();
            assert_eq!(digest, into);
            assert!(digest.iter().any(|&byte| byte != 0));
        }
    }

    #[test]
    fn test_debug_redacts_state() {
        let session = Blake2b::with_key(b"hunter2", 64).unwrap();
        let text = format!("{session:?}");
        assert!(text.contains("REDACTED"));
        assert!(text.contains("keyed: true"));
    }

    #[test]
    fn test_hash_session_reader() {
        let data = seq(10_000);
        let mut session = Blake2b::new(64).unwrap();
        let n = session.ingest_reader(&mut data.as_slice()).unwrap();
        assert_eq!(n, 10_000);
        assert_eq!(
            HashSession::finalize(session),
            Blake2b::digest(&data, 64).unwrap()
        );
    }
}
