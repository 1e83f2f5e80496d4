//! ChaCha20-Poly1305 AEAD
//!
//! RFC 8439 composition, plus the same construction over XChaCha20 for
//! 24-byte nonces:
//!
//! 1. The first 32 bytes of keystream block 0 become the one-time Poly1305 key.
//! 2. The payload is XORed with the keystream starting at block 1.
//! 3. The tag covers `AAD ‖ pad16 ‖ CT ‖ pad16 ‖ le64(|AAD|) ‖ le64(|CT|)`.
//!
//! Decryption always verifies the tag before any plaintext is produced. The
//! streaming decryptor therefore needs a seekable source: it makes one pass
//! to authenticate and a second to decrypt.

use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;

use cinder_core::{
    CHACHA_BLOCK_SIZE, KEY_SIZE, NONCE_SIZE, STREAM_CHUNK_SIZE, TAG_SIZE, XNONCE_SIZE,
};
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::chacha::{ChaCha20, XChaCha20};
use crate::errors::{CryptoError, CryptoResult};
use crate::poly1305::{Poly1305, Tag};
use crate::session::StreamTransform;

/// Stream cipher an [`Aead`] can be built on
pub trait AeadCipher: StreamTransform + Sized {
    /// Required nonce length
    const NONCE_SIZE: usize;
    /// Algorithm name used in logs
    const ALGORITHM: &'static str;

    /// Cipher positioned at keystream block 0
    fn at_origin(key: &[u8; KEY_SIZE], nonce: &[u8]) -> CryptoResult<Self>;

    /// Reposition to block 1, where the payload keystream starts
    fn seek_payload(&mut self);
}

impl AeadCipher for ChaCha20 {
    const NONCE_SIZE: usize = NONCE_SIZE;
    const ALGORITHM: &'static str = "ChaCha20-Poly1305";

    fn at_origin(key: &[u8; KEY_SIZE], nonce: &[u8]) -> CryptoResult<Self> {
        ChaCha20::new(key, nonce, 0)
    }

    fn seek_payload(&mut self) {
        self.seek_block(1);
    }
}

impl AeadCipher for XChaCha20 {
    const NONCE_SIZE: usize = XNONCE_SIZE;
    const ALGORITHM: &'static str = "XChaCha20-Poly1305";

    fn at_origin(key: &[u8; KEY_SIZE], nonce: &[u8]) -> CryptoResult<Self> {
        XChaCha20::new(key, nonce, 0)
    }

    fn seek_payload(&mut self) {
        self.seek_block(1);
    }
}

/// ChaCha20-Poly1305 with 12-byte nonces
pub type ChaCha20Poly1305 = Aead<ChaCha20>;

/// XChaCha20-Poly1305 with 24-byte nonces
pub type XChaCha20Poly1305 = Aead<XChaCha20>;

// =============================================================================
// TAG COMPUTATION
// =============================================================================

/// Running Poly1305 over the AEAD tag layout
struct Authenticator {
    mac: Poly1305,
    aad_len: u64,
    ct_len: u64,
}

impl Authenticator {
    fn new(mac: Poly1305, aad: &[u8]) -> Self {
        let mut auth = Self {
            mac,
            aad_len: aad.len() as u64,
            ct_len: 0,
        };
        auth.mac.update(aad);
        auth.pad(auth.aad_len);
        auth
    }

    fn pad(&mut self, len: u64) {
        let rem = (len % 16) as usize;
        if rem != 0 {
            self.mac.update(&[0u8; 16][..16 - rem]);
        }
    }

    fn absorb(&mut self, ciphertext: &[u8]) {
        self.mac.update(ciphertext);
        self.ct_len += ciphertext.len() as u64;
    }

    fn finish(mut self) -> Tag {
        self.pad(self.ct_len);
        let mut lengths = [0u8; 16];
        lengths[..8].copy_from_slice(&self.aad_len.to_le_bytes());
        lengths[8..].copy_from_slice(&self.ct_len.to_le_bytes());
        self.mac.update(&lengths);
        self.mac.finalize()
    }
}

/// Read until `f` has seen every byte `reader` yields
fn for_each_chunk<R, F>(reader: &mut R, chunk: &mut [u8], mut f: F) -> CryptoResult<u64>
where
    R: Read,
    F: FnMut(&mut [u8]) -> CryptoResult<()>,
{
    let mut total = 0u64;
    loop {
        let n = match reader.read(chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        f(&mut chunk[..n])?;
        total += n as u64;
    }
}

// =============================================================================
// AEAD
// =============================================================================

/// AEAD bound to one key
///
/// The nonce is supplied per message and must never repeat under a key.
pub struct Aead<C: AeadCipher> {
    key: [u8; KEY_SIZE],
    chunk_size: usize,
    _cipher: PhantomData<fn() -> C>,
}

impl<C: AeadCipher> Aead<C> {
    /// Create an AEAD from a 32-byte key
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            got: key.len(),
        })?;
        Ok(Self {
            key,
            chunk_size: STREAM_CHUNK_SIZE,
            _cipher: PhantomData,
        })
    }

    /// Set the buffer size used by the streaming calls
    pub fn with_chunk_size(mut self, chunk_size: usize) -> CryptoResult<Self> {
        if chunk_size == 0 {
            return Err(CryptoError::InvalidParameter(
                "chunk size must be at least 1".into(),
            ));
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Algorithm name
    pub fn algorithm(&self) -> &'static str {
        C::ALGORITHM
    }

    /// Required nonce length
    pub fn nonce_size(&self) -> usize {
        C::NONCE_SIZE
    }

    /// Random nonce of the right length
    pub fn generate_nonce() -> Vec<u8> {
        let mut nonce = vec![0u8; C::NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    }

    /// Calculate sealed length (ciphertext plus tag) for a plaintext length
    pub fn sealed_len(plaintext_len: usize) -> usize {
        plaintext_len + TAG_SIZE
    }

    /// Calculate plaintext length from a sealed length
    pub fn plaintext_len(sealed_len: usize) -> Option<usize> {
        sealed_len.checked_sub(TAG_SIZE)
    }

    /// Cipher at the payload position and an authenticator primed with `aad`
    fn begin(&self, nonce: &[u8], aad: &[u8]) -> CryptoResult<(C, Authenticator)> {
        let mut cipher = C::at_origin(&self.key, nonce)?;

        let mut block0 = [0u8; CHACHA_BLOCK_SIZE];
        cipher.apply_keystream(&mut block0)?;
        let mac = Poly1305::new(&block0[..KEY_SIZE]);
        block0.zeroize();

        cipher.seek_payload();
        Ok((cipher, Authenticator::new(mac?, aad)))
    }

    fn reject(&self, ct_len: u64) -> CryptoError {
        warn!(
            algorithm = C::ALGORITHM,
            ciphertext_len = ct_len,
            "AEAD authentication failed"
        );
        CryptoError::AuthenticationFailed
    }

    // ===== SLICE API =====

    /// Encrypt `plaintext` into `out` (same length) and return the tag
    pub fn seal_detached(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
        out: &mut [u8],
    ) -> CryptoResult<Tag> {
        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        cipher.transform_into(plaintext, out)?;
        auth.absorb(out);
        Ok(auth.finish())
    }

    /// Verify `tag`, then decrypt `ciphertext` into `out` (same length)
    ///
    /// `out` is left untouched when authentication fails.
    pub fn open_detached(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &Tag,
        out: &mut [u8],
    ) -> CryptoResult<()> {
        if out.len() != ciphertext.len() {
            return Err(CryptoError::BufferLengthMismatch {
                expected: ciphertext.len(),
                got: out.len(),
            });
        }

        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        auth.absorb(ciphertext);
        if auth.finish() != *tag {
            return Err(self.reject(ciphertext.len() as u64));
        }
        cipher.transform_into(ciphertext, out)
    }

    /// Encrypt into a new buffer
    ///
    /// # Returns
    /// Tuple of (ciphertext, tag)
    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> CryptoResult<(Vec<u8>, Tag)> {
        let mut out = vec![0u8; plaintext.len()];
        let tag = self.seal_detached(nonce, aad, plaintext, &mut out)?;
        Ok((out, tag))
    }

    /// Verify and decrypt into a new buffer
    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &Tag,
    ) -> CryptoResult<Vec<u8>> {
        let mut out = vec![0u8; ciphertext.len()];
        self.open_detached(nonce, aad, ciphertext, tag, &mut out)?;
        Ok(out)
    }

    /// Encrypt and append the tag
    pub fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let (mut sealed, tag) = self.encrypt(nonce, aad, plaintext)?;
        sealed.extend_from_slice(tag.as_bytes());
        Ok(sealed)
    }

    /// Split off the trailing tag, verify and decrypt
    pub fn open(&self, nonce: &[u8], aad: &[u8], sealed: &[u8]) -> CryptoResult<Vec<u8>> {
        let ct_len = Self::plaintext_len(sealed.len()).ok_or(CryptoError::InvalidTagLength {
            expected: TAG_SIZE,
            got: sealed.len(),
        })?;
        let tag = Tag::from_slice(&sealed[ct_len..])?;
        self.decrypt(nonce, aad, &sealed[..ct_len], &tag)
    }

    // ===== STREAM API =====

    /// Encrypt everything `reader` yields into `writer`, then write the tag
    ///
    /// # Returns
    /// The tag, which has also been written after the ciphertext
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        nonce: &[u8],
        aad: &[u8],
        reader: &mut R,
        writer: &mut W,
    ) -> CryptoResult<Tag> {
        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        debug!(algorithm = C::ALGORITHM, chunk_size = self.chunk_size, "Encrypting stream");

        let mut chunk = vec![0u8; self.chunk_size];
        let total = for_each_chunk(reader, &mut chunk, |data| {
            cipher.apply_keystream(data)?;
            auth.absorb(data);
            writer.write_all(data)?;
            Ok(())
        })?;
        chunk.zeroize();

        let tag = auth.finish();
        writer.write_all(tag.as_bytes())?;
        writer.flush()?;

        debug!(algorithm = C::ALGORITHM, bytes = total, "Stream encrypted");
        Ok(tag)
    }

    /// Decrypt `ciphertext ‖ tag` from the current position of `source` to
    /// its end into `writer`
    ///
    /// Nothing is written unless the whole ciphertext authenticates.
    ///
    /// # Returns
    /// Number of plaintext bytes written
    pub fn decrypt_stream<R: Read + Seek, W: Write>(
        &self,
        nonce: &[u8],
        aad: &[u8],
        source: &mut R,
        writer: &mut W,
    ) -> CryptoResult<u64> {
        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        let start = source.stream_position()?;
        let (ct_len, tag) = self.read_trailing_tag(source, start)?;

        debug!(algorithm = C::ALGORITHM, ciphertext_len = ct_len, "Authenticating stream");
        self.authenticate_range(source, start, ct_len, &mut auth)?;
        if auth.finish() != tag {
            return Err(self.reject(ct_len));
        }

        source.seek(SeekFrom::Start(start))?;
        let mut chunk = vec![0u8; self.chunk_size];
        let written = for_each_chunk(&mut source.by_ref().take(ct_len), &mut chunk, |data| {
            cipher.apply_keystream(data)?;
            writer.write_all(data)?;
            Ok(())
        })?;
        chunk.zeroize();
        writer.flush()?;

        debug!(algorithm = C::ALGORITHM, bytes = written, "Stream decrypted");
        Ok(written)
    }

    /// Encrypt `storage` in place from its current position to its end
    ///
    /// The tag is returned, not written.
    pub fn seal_in_place<S: Read + Write + Seek>(
        &self,
        nonce: &[u8],
        aad: &[u8],
        storage: &mut S,
    ) -> CryptoResult<Tag> {
        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        self.transform_in_place(&mut cipher, storage, Some(&mut auth))?;
        Ok(auth.finish())
    }

    /// Verify `tag` over `storage` from its current position to its end,
    /// then decrypt it in place
    ///
    /// # Returns
    /// Number of bytes decrypted
    pub fn open_in_place<S: Read + Write + Seek>(
        &self,
        nonce: &[u8],
        aad: &[u8],
        storage: &mut S,
        tag: &Tag,
    ) -> CryptoResult<u64> {
        let (mut cipher, mut auth) = self.begin(nonce, aad)?;
        let start = storage.stream_position()?;
        let end = storage.seek(SeekFrom::End(0))?;
        let ct_len = end.saturating_sub(start);

        self.authenticate_range(storage, start, ct_len, &mut auth)?;
        if auth.finish() != *tag {
            return Err(self.reject(ct_len));
        }

        storage.seek(SeekFrom::Start(start))?;
        self.transform_in_place(&mut cipher, storage, None)
    }

    /// Locate and read the tag at the end of `source`
    fn read_trailing_tag<R: Read + Seek>(
        &self,
        source: &mut R,
        start: u64,
    ) -> CryptoResult<(u64, Tag)> {
        let end = source.seek(SeekFrom::End(0))?;
        let total = end.saturating_sub(start);
        if total < TAG_SIZE as u64 {
            return Err(CryptoError::InvalidTagLength {
                expected: TAG_SIZE,
                got: total as usize,
            });
        }

        let ct_len = total - TAG_SIZE as u64;
        source.seek(SeekFrom::Start(start + ct_len))?;
        let mut tag = [0u8; TAG_SIZE];
        source.read_exact(&mut tag)?;
        Ok((ct_len, Tag::new(tag)))
    }

    /// MAC exactly `ct_len` bytes of `source` starting at `start`
    fn authenticate_range<R: Read + Seek>(
        &self,
        source: &mut R,
        start: u64,
        ct_len: u64,
        auth: &mut Authenticator,
    ) -> CryptoResult<()> {
        source.seek(SeekFrom::Start(start))?;
        let mut chunk = vec![0u8; self.chunk_size];
        let seen = for_each_chunk(&mut source.by_ref().take(ct_len), &mut chunk, |data| {
            auth.absorb(data);
            Ok(())
        })?;
        if seen != ct_len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "ciphertext shorter than its recorded length",
            )
            .into());
        }
        Ok(())
    }

    /// XOR the keystream over `storage` chunk by chunk, rewriting each chunk
    /// where it was read; `auth` sees the ciphertext when encrypting
    fn transform_in_place<S: Read + Write + Seek>(
        &self,
        cipher: &mut C,
        storage: &mut S,
        mut auth: Option<&mut Authenticator>,
    ) -> CryptoResult<u64> {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let n = match storage.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let data = &mut chunk[..n];
            cipher.apply_keystream(data)?;
            if let Some(auth) = auth.as_deref_mut() {
                auth.absorb(data);
            }
            storage.seek(SeekFrom::Current(-(n as i64)))?;
            storage.write_all(data)?;
            total += n as u64;
        }
        chunk.zeroize();
        storage.flush()?;
        Ok(total)
    }
}

impl<C: AeadCipher> Drop for Aead<C> {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl<C: AeadCipher> std::fmt::Debug for Aead<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(C::ALGORITHM)
            .field("key", &"[REDACTED]")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::hex;
    use std::io::Cursor;

    const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: If I could offer you \
only one tip for the future, sunscreen would be it.";

    fn rfc_key() -> Vec<u8> {
        (0x80u8..=0x9f).collect()
    }

    #[test]
    fn test_rfc8439_aead_vector() {
        let aead = ChaCha20Poly1305::new(&rfc_key()).unwrap();
        let nonce = hex::decode("070000004041424344454647").unwrap();
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();

        let (ct, tag) = aead.encrypt(&nonce, &aad, SUNSCREEN).unwrap();
        assert_eq!(
            hex::encode(&ct),
            "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
             3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
             92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
             3ff4def08e4b7a9de576d26586cec64b6116"
        );
        assert_eq!(tag.to_hex(), "1ae10b594f09e26a7e902ecbd0600691");

        assert_eq!(aead.decrypt(&nonce, &aad, &ct, &tag).unwrap(), SUNSCREEN);
    }

    #[test]
    fn test_every_single_bit_tamper_fails() {
        let aead = ChaCha20Poly1305::new(&[3u8; 32]).unwrap();
        let nonce = [9u8; 12];
        let aad = b"header".to_vec();
        let (ct, tag) = aead.encrypt(&nonce, &aad, b"attack at dawn, bring snacks").unwrap();

        for i in 0..ct.len() * 8 {
            let mut bad = ct.clone();
            bad[i / 8] ^= 1 << (i % 8);
            let err = aead.decrypt(&nonce, &aad, &bad, &tag).unwrap_err();
            assert!(matches!(err, CryptoError::AuthenticationFailed), "ct bit {i}");
        }
        for i in 0..aad.len() * 8 {
            let mut bad = aad.clone();
            bad[i / 8] ^= 1 << (i % 8);
            assert!(aead.decrypt(&nonce, &bad, &ct, &tag).is_err(), "aad bit {i}");
        }
        for i in 0..TAG_SIZE * 8 {
            let mut bad = *tag.as_bytes();
            bad[i / 8] ^= 1 << (i % 8);
            assert!(
                aead.decrypt(&nonce, &aad, &ct, &Tag::new(bad)).is_err(),
                "tag bit {i}"
            );
        }
    }

    #[test]
    fn test_wrong_nonce_or_key_fails() {
        let aead = ChaCha20Poly1305::new(&[1u8; 32]).unwrap();
        let sealed = aead.seal(&[0u8; 12], b"", b"payload").unwrap();
        assert!(aead.open(&[1u8; 12], b"", &sealed).is_err());

        let other = ChaCha20Poly1305::new(&[2u8; 32]).unwrap();
        assert_eq!(
            other.open(&[0u8; 12], b"", &sealed).unwrap_err().kind(),
            crate::errors::ErrorKind::Authentication
        );
        assert_eq!(aead.open(&[0u8; 12], b"", &sealed).unwrap(), b"payload");
    }

    #[test]
    fn test_open_detached_leaves_output_on_failure() {
        let aead = XChaCha20Poly1305::new(&[5u8; 32]).unwrap();
        let nonce = [4u8; 24];
        let (ct, _) = aead.encrypt(&nonce, b"", b"sixteen byte msg").unwrap();
        let mut out = [0xeeu8; 16];
        let forged = Tag::new([0u8; 16]);
        assert!(aead.open_detached(&nonce, b"", &ct, &forged, &mut out).is_err());
        assert_eq!(out, [0xee; 16]);
    }

    #[test]
    fn test_xchacha_roundtrip_empty_and_large() {
        let aead = XChaCha20Poly1305::new(&[8u8; 32]).unwrap();
        let nonce = XChaCha20Poly1305::generate_nonce();
        assert_eq!(nonce.len(), 24);

        let sealed = aead.seal(&nonce, b"aad", b"").unwrap();
        assert_eq!(sealed.len(), TAG_SIZE);
        assert_eq!(aead.open(&nonce, b"aad", &sealed).unwrap(), b"");

        let big: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let sealed = aead.seal(&nonce, b"aad", &big).unwrap();
        assert_eq!(aead.open(&nonce, b"aad", &sealed).unwrap(), big);
    }

    #[test]
    fn test_length_errors() {
        let aead = ChaCha20Poly1305::new(&[0u8; 32]).unwrap();
        assert!(matches!(
            aead.encrypt(&[0u8; 24], b"", b"x"),
            Err(CryptoError::InvalidNonceLength { expected: 12, got: 24 })
        ));
        assert!(matches!(
            ChaCha20Poly1305::new(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 16 })
        ));
        assert!(matches!(
            aead.open(&[0u8; 12], b"", &[0u8; 15]),
            Err(CryptoError::InvalidTagLength { expected: 16, got: 15 })
        ));
        let mut out = [0u8; 2];
        assert!(matches!(
            aead.seal_detached(&[0u8; 12], b"", b"abc", &mut out),
            Err(CryptoError::BufferLengthMismatch { expected: 3, got: 2 })
        ));
        assert!(aead_with_zero_chunk().is_err());
    }

    fn aead_with_zero_chunk() -> CryptoResult<ChaCha20Poly1305> {
        ChaCha20Poly1305::new(&[0u8; 32])?.with_chunk_size(0)
    }

    #[test]
    fn test_stream_matches_slice_api() {
        let aead = ChaCha20Poly1305::new(&rfc_key()).unwrap().with_chunk_size(7).unwrap();
        let nonce = [2u8; 12];
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 31) as u8).collect();

        let mut sealed = Vec::new();
        let tag = aead
            .encrypt_stream(&nonce, b"ad", &mut data.as_slice(), &mut sealed)
            .unwrap();
        assert_eq!(sealed, aead.seal(&nonce, b"ad", &data).unwrap());
        assert_eq!(&sealed[data.len()..], tag.as_bytes());

        let mut plain = Vec::new();
        let n = aead
            .decrypt_stream(&nonce, b"ad", &mut Cursor::new(&sealed), &mut plain)
            .unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(plain, data);
    }

    #[test]
    fn test_decrypt_stream_writes_nothing_on_tamper() {
        let aead = ChaCha20Poly1305::new(&[6u8; 32]).unwrap();
        let nonce = [0u8; 12];
        let mut sealed = aead.seal(&nonce, b"", &[0x41u8; 9000]).unwrap();
        sealed[8500] ^= 0x80;

        let mut plain = Vec::new();
        let err = aead
            .decrypt_stream(&nonce, b"", &mut Cursor::new(&sealed), &mut plain)
            .unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailed));
        assert!(plain.is_empty());

        let mut short = Cursor::new(vec![0u8; 10]);
        assert!(matches!(
            aead.decrypt_stream(&nonce, b"", &mut short, &mut plain),
            Err(CryptoError::InvalidTagLength { expected: 16, got: 10 })
        ));
    }

    #[test]
    fn test_decrypt_stream_from_offset() {
        let aead = XChaCha20Poly1305::new(&[7u8; 32]).unwrap();
        let nonce = [1u8; 24];
        let mut framed = b"HDR:".to_vec();
        framed.extend(aead.seal(&nonce, b"", b"body").unwrap());

        let mut source = Cursor::new(framed);
        source.set_position(4);
        let mut plain = Vec::new();
        aead.decrypt_stream(&nonce, b"", &mut source, &mut plain).unwrap();
        assert_eq!(plain, b"body");
    }

    #[test]
    fn test_in_place_roundtrip() {
        let aead = ChaCha20Poly1305::new(&[9u8; 32]).unwrap().with_chunk_size(100).unwrap();
        let nonce = [3u8; 12];
        let data: Vec<u8> = (0..777u32).map(|i| i as u8).collect();

        let mut storage = Cursor::new(data.clone());
        let tag = aead.seal_in_place(&nonce, b"meta", &mut storage).unwrap();
        let (ct, expected_tag) = aead.encrypt(&nonce, b"meta", &data).unwrap();
        assert_eq!(storage.get_ref(), &ct);
        assert_eq!(tag, expected_tag);

        storage.set_position(0);
        let n = aead.open_in_place(&nonce, b"meta", &mut storage, &tag).unwrap();
        assert_eq!(n, 777);
        assert_eq!(storage.into_inner(), data);
    }

    #[test]
    fn test_open_in_place_rejects_before_writing() {
        let aead = ChaCha20Poly1305::new(&[9u8; 32]).unwrap();
        let nonce = [3u8; 12];
        let mut storage = Cursor::new(vec![1u8; 50]);
        let tag = aead.seal_in_place(&nonce, b"", &mut storage).unwrap();
        let sealed = storage.get_ref().clone();

        storage.set_position(0);
        assert!(aead.open_in_place(&nonce, b"x", &mut storage, &tag).is_err());
        assert_eq!(storage.get_ref(), &sealed);
    }

    #[test]
    fn test_debug_redacts_key() {
        let aead = ChaCha20Poly1305::new(&[0x61u8; 32]).unwrap();
        let text = format!("{aead:?}");
        assert!(text.contains("ChaCha20-Poly1305"));
        assert!(text.contains("REDACTED"));
        assert_eq!(aead.nonce_size(), 12);
        assert_eq!(aead.algorithm(), "ChaCha20-Poly1305");
    }
}
