//! ChaCha20 and XChaCha20
//!
//! Both ciphers run the same 20-round block function over a 16-word state:
//!
//! ```text
//! | c0  c1  c2  c3 |   constants "expand 32-byte k"
//! | k0  k1  k2  k3 |   key
//! | k4  k5  k6  k7 |   key
//! | b0  b1  n0  n1 |   64-bit block counter, 64-bit nonce
//! ```
//!
//! ChaCha20 takes a 12-byte nonce: its first four bytes form the high half of
//! the block counter and the caller's 32-bit initial counter the low half, so
//! the layout is word-for-word RFC 8439. XChaCha20 derives a subkey with
//! HChaCha20 over the first 16 nonce bytes and then runs with a zero high
//! counter word, giving the caller the full 64-bit counter.
//!
//! The counter never wraps. A transform that would need a block beyond
//! `2^64 - 1` fails with [`CryptoError::CounterOverflow`] before any byte is
//! changed.

use std::fmt;

use cinder_core::{CHACHA_BLOCK_SIZE, KEY_SIZE, NONCE_SIZE, XNONCE_SIZE};
use tracing::error;
use zeroize::Zeroize;

use crate::errors::{CryptoError, CryptoResult};
use crate::session::StreamTransform;

/// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x61707865, 0x3320646e, 0x79622d32, 0x6b206574];

/// Number of blocks the 64-bit counter can address
const COUNTER_SPACE: u128 = 1 << 64;

// =============================================================================
// BLOCK FUNCTION
// =============================================================================

#[inline(always)]
fn quarter_round(s: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(16);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(12);
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(8);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(7);
}

/// Ten double rounds, without the final feed-forward addition
fn permute(state: &[u32; 16]) -> [u32; 16] {
    let mut x = *state;
    for _ in 0..10 {
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 1, 5, 9, 13);
        quarter_round(&mut x, 2, 6, 10, 14);
        quarter_round(&mut x, 3, 7, 11, 15);
        quarter_round(&mut x, 0, 5, 10, 15);
        quarter_round(&mut x, 1, 6, 11, 12);
        quarter_round(&mut x, 2, 7, 8, 13);
        quarter_round(&mut x, 3, 4, 9, 14);
    }
    x
}

fn load_key(key: &[u8; KEY_SIZE]) -> [u32; 8] {
    let mut words = [0u32; 8];
    for (i, chunk) in key.chunks_exact(4).enumerate() {
        words[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

fn key_array(key: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        got: key.len(),
    })
}

/// HChaCha20: derive a 32-byte subkey from a key and a 16-byte input
///
/// Runs the permutation without the final addition and keeps words
/// 0..4 and 12..16.
pub fn hchacha20(key: &[u8; KEY_SIZE], input: &[u8; 16]) -> [u8; KEY_SIZE] {
    let mut state = [0u32; 16];
    state[..4].copy_from_slice(&SIGMA);
    state[4..12].copy_from_slice(&load_key(key));
    for (i, chunk) in input.chunks_exact(4).enumerate() {
        state[12 + i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let mut x = permute(&state);
    let mut out = [0u8; KEY_SIZE];
    for (i, word) in x[..4].iter().chain(&x[12..]).enumerate() {
        out[i * 4..(i + 1) * 4].copy_from_slice(&word.to_le_bytes());
    }

    state.zeroize();
    x.zeroize();
    out
}

/// Shared ChaCha20 state: constants, key and the two nonce words
///
/// Immutable once built; the block counter is supplied per call.
#[derive(Clone)]
pub struct ChaChaCore {
    state: [u32; 16],
}

impl ChaChaCore {
    /// Build the initial state for a 32-byte key and 8-byte nonce
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; 8]) -> Self {
        let mut state = [0u32; 16];
        state[..4].copy_from_slice(&SIGMA);
        state[4..12].copy_from_slice(&load_key(key));
        state[14] = u32::from_le_bytes([nonce[0], nonce[1], nonce[2], nonce[3]]);
        state[15] = u32::from_le_bytes([nonce[4], nonce[5], nonce[6], nonce[7]]);
        Self { state }
    }

    /// Keystream block for a 64-bit block counter
    pub fn block(&self, counter: u64) -> [u8; CHACHA_BLOCK_SIZE] {
        let mut input = self.state;
        input[12] = counter as u32;
        input[13] = (counter >> 32) as u32;

        let mut x = permute(&input);
        let mut out = [0u8; CHACHA_BLOCK_SIZE];
        for i in 0..16 {
            let word = x[i].wrapping_add(input[i]);
            out[i * 4..(i + 1) * 4].copy_from_slice(&word.to_le_bytes());
        }

        input.zeroize();
        x.zeroize();
        out
    }
}

impl Drop for ChaChaCore {
    fn drop(&mut self) {
        self.state.zeroize();
    }
}

impl fmt::Debug for ChaChaCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaChaCore").field("state", &"[REDACTED]").finish()
    }
}

// =============================================================================
// KEYSTREAM CURSOR
// =============================================================================

/// Position in the keystream: next block to generate plus the unused tail
/// of the current block
#[derive(Clone)]
struct Keystream {
    core: ChaChaCore,
    next_block: u128,
    buf: [u8; CHACHA_BLOCK_SIZE],
    offset: usize,
}

impl Keystream {
    fn new(core: ChaChaCore, counter: u64) -> Self {
        Self {
            core,
            next_block: counter as u128,
            buf: [0u8; CHACHA_BLOCK_SIZE],
            offset: CHACHA_BLOCK_SIZE,
        }
    }

    fn seek(&mut self, counter: u64) {
        self.next_block = counter as u128;
        self.buf.zeroize();
        self.offset = CHACHA_BLOCK_SIZE;
    }

    /// Counter of the block the next unbuffered byte comes from
    fn position(&self) -> u128 {
        self.next_block
    }

    fn apply(&mut self, data: &mut [u8]) -> CryptoResult<()> {
        let buffered = CHACHA_BLOCK_SIZE - self.offset;
        if data.len() > buffered {
            let missing = data.len() - buffered;
            let needed = ((missing + CHACHA_BLOCK_SIZE - 1) / CHACHA_BLOCK_SIZE) as u128;
            if needed > COUNTER_SPACE - self.next_block {
                error!(
                    next_block = %self.next_block,
                    requested_bytes = data.len(),
                    "ChaCha20 block counter exhausted"
                );
                return Err(CryptoError::CounterOverflow);
            }
        }

        for byte in data.iter_mut() {
            if self.offset == CHACHA_BLOCK_SIZE {
                self.buf = self.core.block(self.next_block as u64);
                self.next_block += 1;
                self.offset = 0;
            }
            *byte ^= self.buf[self.offset];
            self.offset += 1;
        }
        Ok(())
    }
}

impl Drop for Keystream {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

// =============================================================================
// CIPHERS
// =============================================================================

/// ChaCha20 with a 12-byte nonce
#[derive(Clone)]
pub struct ChaCha20 {
    stream: Keystream,
    nonce_high: u64,
}

impl ChaCha20 {
    /// Create a cipher
    ///
    /// # Arguments
    /// * `key` - exactly 32 bytes
    /// * `nonce` - exactly 12 bytes
    /// * `counter` - initial block counter (RFC 8439 uses 1 for payloads)
    pub fn new(key: &[u8], nonce: &[u8], counter: u32) -> CryptoResult<Self> {
        let mut key = key_array(key)?;
        if nonce.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                got: nonce.len(),
            });
        }

        let nonce_high = u32::from_le_bytes([nonce[0], nonce[1], nonce[2], nonce[3]]) as u64;
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&nonce[4..]);

        let core = ChaChaCore::new(&key, &tail);
        key.zeroize();

        let nonce_high = nonce_high << 32;
        Ok(Self {
            stream: Keystream::new(core, nonce_high | counter as u64),
            nonce_high,
        })
    }

    /// Reposition to the start of block `counter`
    pub fn seek_block(&mut self, counter: u32) {
        self.stream.seek(self.nonce_high | counter as u64);
    }

    /// Full 64-bit counter of the next keystream block
    pub fn block_position(&self) -> u128 {
        self.stream.position()
    }
}

impl StreamTransform for ChaCha20 {
    fn apply_keystream(&mut self, data: &mut [u8]) -> CryptoResult<()> {
        self.stream.apply(data)
    }
}

impl fmt::Debug for ChaCha20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaCha20")
            .field("next_block", &self.stream.next_block)
            .finish_non_exhaustive()
    }
}

/// XChaCha20 with a 24-byte nonce
#[derive(Clone)]
pub struct XChaCha20 {
    stream: Keystream,
}

impl XChaCha20 {
    /// Create a cipher
    ///
    /// # Arguments
    /// * `key` - exactly 32 bytes
    /// * `nonce` - exactly 24 bytes
    /// * `counter` - initial 64-bit block counter
    pub fn new(key: &[u8], nonce: &[u8], counter: u64) -> CryptoResult<Self> {
        let mut key = key_array(key)?;
        if nonce.len() != XNONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: XNONCE_SIZE,
                got: nonce.len(),
            });
        }

        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&nonce[..16]);
        let mut subkey = hchacha20(&key, &prefix);
        key.zeroize();

        let mut tail = [0u8; 8];
        tail.copy_from_slice(&nonce[16..]);
        let core = ChaChaCore::new(&subkey, &tail);
        subkey.zeroize();

        Ok(Self {
            stream: Keystream::new(core, counter),
        })
    }

    /// Reposition to the start of block `counter`
    pub fn seek_block(&mut self, counter: u64) {
        self.stream.seek(counter);
    }

    /// Counter of the next keystream block
    pub fn block_position(&self) -> u128 {
        self.stream.position()
    }
}

impl StreamTransform for XChaCha20 {
    fn apply_keystream(&mut self, data: &mut [u8]) -> CryptoResult<()> {
        self.stream.apply(data)
    }
}

impl fmt::Debug for XChaCha20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XChaCha20")
            .field("next_block", &self.stream.next_block)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::hex;

    const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: If I could offer you \
only one tip for the future, sunscreen would be it.";

    fn seq_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn test_block_function_vector() {
        let mut cipher =
            ChaCha20::new(&seq_key(), &hex::decode("000000090000004a00000000").unwrap(), 1)
                .unwrap();
        let block = cipher.transform(&[0u8; 64]).unwrap();
        assert_eq!(hex::encode(&block[..16]), "10f1e7e4d13b5915500fdd1fa32071c4");
    }

    #[test]
    fn test_encryption_vector() {
        let nonce = hex::decode("000000000000004a00000000").unwrap();
        let mut cipher = ChaCha20::new(&seq_key(), &nonce, 1).unwrap();
        let ct = cipher.transform(SUNSCREEN).unwrap();
        assert_eq!(ct.len(), SUNSCREEN.len());
        assert_eq!(hex::encode(&ct[..16]), "6e2e359a2568f98041ba0728dd0d6981");

        let mut cipher = ChaCha20::new(&seq_key(), &nonce, 1).unwrap();
        assert_eq!(cipher.transform(&ct).unwrap(), SUNSCREEN);
    }

    #[test]
    fn test_hchacha20_vector() {
        let key: [u8; 32] = seq_key().try_into().unwrap();
        let input: [u8; 16] = hex::decode("000000090000004a0000000031415927")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(
            hex::encode(&hchacha20(&key, &input)),
            "82413b4227b27bfed30e42508a877d73a0f9e4d58a74a853c12ec41326d3ecdc"
        );
    }

    #[test]
    fn test_xchacha20_roundtrip() {
        let nonce: Vec<u8> = (100u8..124).collect();
        let data: Vec<u8> = (0..1000).map(|i| (i * 7) as u8).collect();

        let mut enc = XChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        let ct = enc.transform(&data).unwrap();
        assert_ne!(ct, data);

        let mut dec = XChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        assert_eq!(dec.transform(&ct).unwrap(), data);
    }

    #[test]
    fn test_xchacha20_is_chacha20_under_subkey() {
        let key: [u8; 32] = seq_key().try_into().unwrap();
        let nonce: Vec<u8> = (0u8..24).collect();
        let prefix: [u8; 16] = nonce[..16].try_into().unwrap();
        let subkey = hchacha20(&key, &prefix);

        let mut inner_nonce = vec![0u8; 4];
        inner_nonce.extend_from_slice(&nonce[16..]);

        let mut x = XChaCha20::new(&key, &nonce, 3).unwrap();
        let mut c = ChaCha20::new(&subkey, &inner_nonce, 3).unwrap();
        assert_eq!(x.transform(&[0u8; 200]).unwrap(), c.transform(&[0u8; 200]).unwrap());
    }

    #[test]
    fn test_split_calls_match_single_call() {
        let nonce = [7u8; 12];
        let data = vec![0x5au8; 300];
        let mut whole = ChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        let expected = whole.transform(&data).unwrap();

        let mut pieces = ChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        let mut got = Vec::new();
        for chunk in data.chunks(37) {
            got.extend(pieces.transform(chunk).unwrap());
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn test_seek_block() {
        let nonce = [1u8; 12];
        let mut a = ChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        let stream = a.transform(&[0u8; 192]).unwrap();

        let mut b = ChaCha20::new(&seq_key(), &nonce, 0).unwrap();
        b.transform(&[0u8; 10]).unwrap();
        b.seek_block(2);
        assert_eq!(b.transform(&[0u8; 64]).unwrap(), &stream[128..]);
    }

    #[test]
    fn test_transform_into_length_check() {
        let mut cipher = ChaCha20::new(&seq_key(), &[0u8; 12], 0).unwrap();
        let mut out = [0u8; 3];
        assert!(matches!(
            cipher.transform_into(&[1, 2, 3, 4], &mut out),
            Err(CryptoError::BufferLengthMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            ChaCha20::new(&[0u8; 31], &[0u8; 12], 0),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 31 })
        ));
        assert!(matches!(
            ChaCha20::new(&[0u8; 32], &[0u8; 24], 0),
            Err(CryptoError::InvalidNonceLength { expected: 12, got: 24 })
        ));
        assert!(matches!(
            XChaCha20::new(&[0u8; 32], &[0u8; 12], 0),
            Err(CryptoError::InvalidNonceLength { expected: 24, got: 12 })
        ));
    }

    #[test]
    fn test_counter_overflow_leaves_data_untouched() {
        // Nonce high word and counter both all-ones: exactly one block left
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&[0xff; 4]);
        let mut cipher = ChaCha20::new(&seq_key(), &nonce, u32::MAX).unwrap();

        let mut too_much = vec![0xaau8; 65];
        let err = cipher.apply_keystream(&mut too_much).unwrap_err();
        assert!(matches!(err, CryptoError::CounterOverflow));
        assert!(too_much.iter().all(|&b| b == 0xaa));

        let mut last_block = vec![0u8; 64];
        cipher.apply_keystream(&mut last_block).unwrap();
        let mut one_more = [0x11u8; 1];
        assert!(matches!(
            cipher.apply_keystream(&mut one_more),
            Err(CryptoError::CounterOverflow)
        ));
        assert_eq!(one_more, [0x11]);

        // Empty input never fails
        cipher.apply_keystream(&mut []).unwrap();
    }

    #[test]
    fn test_xchacha20_counter_overflow() {
        let mut cipher = XChaCha20::new(&seq_key(), &[0u8; 24], u64::MAX).unwrap();
        let mut data = vec![0u8; 40];
        cipher.apply_keystream(&mut data).unwrap();
        // 24 bytes of the final block remain
        let mut rest = vec![0u8; 24];
        cipher.apply_keystream(&mut rest).unwrap();
        let mut beyond = vec![0u8; 1];
        assert_eq!(
            cipher.apply_keystream(&mut beyond).unwrap_err().kind(),
            crate::errors::ErrorKind::ArithmeticOverflow
        );
    }

    #[test]
    fn test_counter_carries_into_nonce_word() {
        let mut cipher = ChaCha20::new(&seq_key(), &[0u8; 12], u32::MAX).unwrap();
        assert_eq!(cipher.block_position(), u32::MAX as u128);
        cipher.apply_keystream(&mut [0u8; 64]).unwrap();
        assert_eq!(cipher.block_position(), 1u128 << 32);
    }

    #[test]
    fn test_debug_hides_key() {
        let cipher = ChaCha20::new(&[0x42u8; 32], &[0u8; 12], 0).unwrap();
        let text = format!("{cipher:?}");
        assert!(!text.contains("66"));
        assert!(text.starts_with("ChaCha20"));
    }
}
