//! Session Capabilities
//!
//! The two shapes every primitive in this crate takes:
//!
//! - [`HashSession`]: `ingest` bytes any number of times, then `finalize`
//!   once into a digest or tag. Implemented by BLAKE2b, BLAKE2s and Poly1305.
//! - [`StreamTransform`]: XOR a keystream over bytes. Implemented by
//!   ChaCha20 and XChaCha20.
//!
//! Sessions are plain values owned by one caller. `finalize` consumes the
//! session, so a finished session cannot be fed again.

use std::io::Read;

use cinder_core::STREAM_CHUNK_SIZE;

use crate::errors::{CryptoError, CryptoResult};

/// Incremental hash or MAC
pub trait HashSession {
    /// Number of bytes `finalize` returns
    fn output_len(&self) -> usize;

    /// Absorb more input
    fn ingest(&mut self, data: &[u8]);

    /// Finish and return the digest
    fn finalize(self) -> Vec<u8>
    where
        Self: Sized;

    /// Absorb everything `reader` yields, in [`STREAM_CHUNK_SIZE`] pieces
    ///
    /// # Returns
    /// Total number of bytes absorbed
    fn ingest_reader<R: Read>(&mut self, reader: &mut R) -> CryptoResult<u64>
    where
        Self: Sized,
    {
        let mut chunk = [0u8; STREAM_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.ingest(&chunk[..n]);
            total += n as u64;
        }
    }
}

/// Keystream transform (encryption and decryption are the same operation)
pub trait StreamTransform {
    /// XOR the next `data.len()` keystream bytes into `data`
    ///
    /// Fails without touching `data` if the keystream cannot cover it.
    fn apply_keystream(&mut self, data: &mut [u8]) -> CryptoResult<()>;

    /// Transform `input` into a new buffer
    fn transform(&mut self, input: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut out = input.to_vec();
        self.apply_keystream(&mut out)?;
        Ok(out)
    }

    /// Transform `input` into `output`, which must have the same length
    fn transform_into(&mut self, input: &[u8], output: &mut [u8]) -> CryptoResult<()> {
        if output.len() != input.len() {
            return Err(CryptoError::BufferLengthMismatch {
                expected: input.len(),
                got: output.len(),
            });
        }
        output.copy_from_slice(input);
        self.apply_keystream(output)
    }
}
