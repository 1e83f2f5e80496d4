//! Key Derivation
//!
//! Two derivers over any [`HashSession`] that can be cloned:
//!
//! - [`Pbkdf2`]: iterated stretching with a keyed hash as the PRF. The PRF
//!   is given as a keyed prototype session; each application clones it.
//! - [`Hkdf`]: expansion `T(1) = H(data ‖ 0x01)`,
//!   `T(i) = H(T(i-1) ‖ data ‖ i)`, capped at 255 blocks.
//!
//! Both are byte streams: successive `get_bytes` calls continue where the
//! previous call stopped, and `reset` starts over.

use std::fmt;

use cinder_core::{xor_in_place, BLAKE2B_MAX_OUTPUT};
use zeroize::Zeroize;

use crate::blake2::Blake2b;
use crate::errors::{CryptoError, CryptoResult};
use crate::session::HashSession;

/// HKDF block counter is a single byte
const HKDF_MAX_BLOCKS: usize = 255;

/// Keyed BLAKE2b-512 for use as a PRF
///
/// Keys longer than a BLAKE2b key are first hashed down to 64 bytes, the
/// same rule HMAC applies to long keys.
pub fn blake2b_prf(key: &[u8]) -> CryptoResult<Blake2b> {
    if key.len() <= BLAKE2B_MAX_OUTPUT {
        return Blake2b::with_key(key, BLAKE2B_MAX_OUTPUT);
    }
    let mut reduced = Blake2b::digest(key, BLAKE2B_MAX_OUTPUT)?;
    let prf = Blake2b::with_key(&reduced, BLAKE2B_MAX_OUTPUT);
    reduced.zeroize();
    prf
}

fn check_length(length: usize) -> CryptoResult<()> {
    if length == 0 {
        return Err(CryptoError::InvalidParameter(
            "derived key length must be at least 1".into(),
        ));
    }
    Ok(())
}

/// A resettable stream of derived bytes
pub trait DeriveBytes {
    /// Next `length` bytes of the stream
    fn get_bytes(&mut self, length: usize) -> CryptoResult<Vec<u8>>;

    /// Restart the stream from its first byte
    fn reset(&mut self);
}

/// Leftover bytes of the last block produced
#[derive(Default)]
struct Pending {
    block: Vec<u8>,
    used: usize,
}

impl Pending {
    fn clear(&mut self) {
        self.block.zeroize();
        self.block.clear();
        self.used = 0;
    }

    /// Move as many pending bytes as fit into `out`, returning the count
    fn drain_into(&mut self, out: &mut Vec<u8>, want: usize) -> usize {
        let available = self.block.len() - self.used;
        let take = available.min(want);
        out.extend_from_slice(&self.block[self.used..self.used + take]);
        self.used += take;
        take
    }

    fn refill(&mut self, block: Vec<u8>) {
        self.block.zeroize();
        self.block = block;
        self.used = 0;
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.block.zeroize();
    }
}

// =============================================================================
// PBKDF2
// =============================================================================

/// PBKDF2 with a keyed-hash PRF
pub struct Pbkdf2<H: HashSession + Clone> {
    prf: H,
    salt: Vec<u8>,
    iterations: u32,
    next_index: u64,
    pending: Pending,
}

impl<H: HashSession + Clone> Pbkdf2<H> {
    /// Create a deriver
    ///
    /// # Arguments
    /// * `prf` - Keyed session used as the PRF (the password is its key)
    /// * `salt` - Salt bytes
    /// * `iterations` - PRF applications per block, at least 1
    pub fn new(prf: H, salt: &[u8], iterations: u32) -> CryptoResult<Self> {
        if iterations == 0 {
            return Err(CryptoError::InvalidParameter(
                "iteration count must be at least 1".into(),
            ));
        }
        Ok(Self {
            prf,
            salt: salt.to_vec(),
            iterations,
            next_index: 1,
            pending: Pending::default(),
        })
    }

    /// Iteration count
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// T_i = U_1 ^ U_2 ^ ... ^ U_c
    fn block(&self, index: u32) -> CryptoResult<Vec<u8>> {
        let mut prf = self.prf.clone();
        prf.ingest(&self.salt);
        prf.ingest(&index.to_be_bytes());
        let mut u = prf.finalize();
        let mut t = u.clone();

        for _ in 1..self.iterations {
            let mut prf = self.prf.clone();
            prf.ingest(&u);
            let next = prf.finalize();
            u.zeroize();
            u = next;
            xor_in_place(&mut t, &u)?;
        }

        u.zeroize();
        Ok(t)
    }

    /// Next `length` bytes of the derived stream
    pub fn get_bytes(&mut self, length: usize) -> CryptoResult<Vec<u8>> {
        check_length(length)?;

        let mut out = Vec::with_capacity(length);
        let mut want = length - self.pending.drain_into(&mut out, length);

        while want > 0 {
            let index = u32::try_from(self.next_index).map_err(|_| {
                CryptoError::OutputLimitExceeded {
                    max: (u32::MAX as usize).saturating_mul(self.prf.output_len()),
                    requested: length,
                }
            })?;
            let block = self.block(index)?;
            self.next_index += 1;
            self.pending.refill(block);
            want -= self.pending.drain_into(&mut out, want);
        }

        Ok(out)
    }

    /// Restart the stream from block 1
    pub fn reset(&mut self) {
        self.next_index = 1;
        self.pending.clear();
    }
}

impl<H: HashSession + Clone> DeriveBytes for Pbkdf2<H> {
    fn get_bytes(&mut self, length: usize) -> CryptoResult<Vec<u8>> {
        Pbkdf2::get_bytes(self, length)
    }

    fn reset(&mut self) {
        Pbkdf2::reset(self);
    }
}

impl Pbkdf2<Blake2b> {
    /// PBKDF2 over keyed BLAKE2b-512 with `password` as the key
    pub fn with_blake2b(password: &[u8], salt: &[u8], iterations: u32) -> CryptoResult<Self> {
        Self::new(blake2b_prf(password)?, salt, iterations)
    }
}

impl<H: HashSession + Clone> Drop for Pbkdf2<H> {
    fn drop(&mut self) {
        self.salt.zeroize();
    }
}

impl<H: HashSession + Clone> fmt::Debug for Pbkdf2<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pbkdf2")
            .field("iterations", &self.iterations)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// HKDF
// =============================================================================

/// HKDF-style expansion over a hash session
pub struct Hkdf<H: HashSession + Clone> {
    hash: H,
    data: Vec<u8>,
    previous: Vec<u8>,
    next_index: usize,
    produced: usize,
    pending: Pending,
}

impl<H: HashSession + Clone> Hkdf<H> {
    /// Create an expander
    ///
    /// # Arguments
    /// * `hash` - Prototype session (keyed or not) cloned for every block
    /// * `data` - Input keying material and context
    pub fn new(hash: H, data: &[u8]) -> Self {
        Self {
            hash,
            data: data.to_vec(),
            previous: Vec::new(),
            next_index: 1,
            produced: 0,
            pending: Pending::default(),
        }
    }

    /// Largest total output: 255 hash blocks
    pub fn max_output(&self) -> usize {
        HKDF_MAX_BLOCKS * self.hash.output_len()
    }

    fn block(&mut self) -> Vec<u8> {
        let mut hash = self.hash.clone();
        hash.ingest(&self.previous);
        hash.ingest(&self.data);
        hash.ingest(&[self.next_index as u8]);
        let block = hash.finalize();

        self.previous.zeroize();
        self.previous = block.clone();
        self.next_index += 1;
        block
    }

    /// Next `length` bytes of the expansion
    pub fn get_bytes(&mut self, length: usize) -> CryptoResult<Vec<u8>> {
        check_length(length)?;

        let max = self.max_output();
        let requested = self.produced.saturating_add(length);
        if requested > max {
            return Err(CryptoError::OutputLimitExceeded { max, requested });
        }

        let mut out = Vec::with_capacity(length);
        let mut want = length - self.pending.drain_into(&mut out, length);
        while want > 0 {
            let block = self.block();
            self.pending.refill(block);
            want -= self.pending.drain_into(&mut out, want);
        }

        self.produced += length;
        Ok(out)
    }

    /// Restart the expansion from T(1)
    pub fn reset(&mut self) {
        self.previous.zeroize();
        self.previous.clear();
        self.next_index = 1;
        self.produced = 0;
        self.pending.clear();
    }
}

impl<H: HashSession + Clone> DeriveBytes for Hkdf<H> {
    fn get_bytes(&mut self, length: usize) -> CryptoResult<Vec<u8>> {
        Hkdf::get_bytes(self, length)
    }

    fn reset(&mut self) {
        Hkdf::reset(self);
    }
}

impl Hkdf<Blake2b> {
    /// Extract a uniform pseudo-random key from non-uniform input
    ///
    /// Keyed BLAKE2b-512 with `salt` as the key; an empty salt is the
    /// unkeyed hash.
    pub fn extract(salt: &[u8], ikm: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut prf = blake2b_prf(salt)?;
        prf.update(ikm);
        Ok(prf.finalize())
    }

    /// Expansion over unkeyed BLAKE2b-512
    pub fn with_blake2b(data: &[u8]) -> CryptoResult<Self> {
        Ok(Self::new(Blake2b::new(BLAKE2B_MAX_OUTPUT)?, data))
    }
}

impl<H: HashSession + Clone> Drop for Hkdf<H> {
    fn drop(&mut self) {
        self.data.zeroize();
        self.previous.zeroize();
    }
}

impl<H: HashSession + Clone> fmt::Debug for Hkdf<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hkdf")
            .field("produced", &self.produced)
            .finish_non_exhaustive()
    }
}
