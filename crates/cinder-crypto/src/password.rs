//! Password Hashing
//!
//! [`PasswordHash`] wraps any [`DeriveBytes`] and compares regenerated
//! output against a candidate in constant time.
//!
//! The account-level API stores PBKDF2 over keyed BLAKE2b-512:
//!
//! ```text
//! $b2pbkdf2$<work_factor>$<salt hex>$<hash hex>
//! ```
//!
//! The PBKDF2 salt is `salt ‖ username`, so a stored hash only verifies for
//! the account it was created for.

use std::fmt;
use std::str::FromStr;

use cinder_core::{ct_eq, hex, BLAKE2B_MAX_OUTPUT};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::blake2::Blake2b;
use crate::errors::{CryptoError, CryptoResult};
use crate::kdf::{DeriveBytes, Pbkdf2};

/// Identifier in the stored-hash format
pub const SCHEME: &str = "b2pbkdf2";

/// Default PBKDF2 iterations
pub const DEFAULT_WORK_FACTOR: u32 = 10_000;

/// Default derived hash length
pub const DEFAULT_HASH_LENGTH: usize = BLAKE2B_MAX_OUTPUT;

/// Default salt length
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// Shortest salt accepted by [`PasswordParams::validate`]
pub const MIN_SALT_LENGTH: usize = 8;

// =============================================================================
// FACADE
// =============================================================================

/// Generate-and-compare facade over a derived byte stream
pub struct PasswordHash<K: DeriveBytes> {
    kdf: K,
}

impl<K: DeriveBytes> PasswordHash<K> {
    pub fn new(kdf: K) -> Self {
        Self { kdf }
    }

    /// First `length` bytes of the derived stream
    pub fn generate(&mut self, length: usize) -> CryptoResult<Vec<u8>> {
        self.kdf.reset();
        self.kdf.get_bytes(length)
    }

    /// Whether the first `length` derived bytes equal `candidate`
    ///
    /// A candidate of a different length is never equal.
    pub fn validate(&mut self, length: usize, candidate: &[u8]) -> CryptoResult<bool> {
        let mut derived = self.generate(length)?;
        let matches = ct_eq(&derived, candidate);
        derived.zeroize();
        Ok(matches)
    }

    /// Unwrap the underlying deriver
    pub fn into_inner(self) -> K {
        self.kdf
    }
}

impl<K: DeriveBytes> fmt::Debug for PasswordHash<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash").finish_non_exhaustive()
    }
}

// =============================================================================
// STORED HASH
// =============================================================================

/// Parsed `$b2pbkdf2$...` record
#[derive(Clone, PartialEq, Eq)]
pub struct StoredHash {
    work_factor: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl StoredHash {
    /// Assemble a record from its parts
    pub fn new(work_factor: u32, salt: Vec<u8>, hash: Vec<u8>) -> CryptoResult<Self> {
        if work_factor == 0 {
            return Err(CryptoError::MalformedStoredHash(
                "work factor must be at least 1".into(),
            ));
        }
        if hash.is_empty() {
            return Err(CryptoError::MalformedStoredHash("empty hash".into()));
        }
        Ok(Self {
            work_factor,
            salt,
            hash,
        })
    }

    pub fn work_factor(&self) -> u32 {
        self.work_factor
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
}

impl fmt::Display for StoredHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}${}${}${}",
            SCHEME,
            self.work_factor,
            hex::encode(&self.salt),
            hex::encode(&self.hash)
        )
    }
}

impl fmt::Debug for StoredHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredHash")
            .field("work_factor", &self.work_factor)
            .field("salt_len", &self.salt.len())
            .field("hash_len", &self.hash.len())
            .finish()
    }
}

impl FromStr for StoredHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |why: &str| CryptoError::MalformedStoredHash(why.to_string());

        let rest = s.strip_prefix('$').ok_or_else(|| malformed("missing leading '$'"))?;
        let fields: Vec<&str> = rest.split('$').collect();
        let [scheme, work, salt, hash] = fields[..] else {
            return Err(malformed("expected 4 '$'-separated fields"));
        };

        if scheme != SCHEME {
            return Err(malformed("unknown scheme"));
        }
        let work_factor = work
            .parse::<u32>()
            .map_err(|_| malformed("work factor is not a number"))?;

        Self::new(work_factor, hex::decode(salt)?, hex::decode(hash)?)
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Password hashing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordParams {
    /// PBKDF2 iterations
    pub work_factor: u32,
    /// Derived hash length in bytes
    pub hash_length: usize,
    /// Random salt length in bytes
    pub salt_length: usize,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            work_factor: DEFAULT_WORK_FACTOR,
            hash_length: DEFAULT_HASH_LENGTH,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl PasswordParams {
    /// Check ranges
    pub fn validate(&self) -> CryptoResult<()> {
        if self.work_factor == 0 {
            return Err(CryptoError::InvalidParameter(
                "work_factor must be at least 1".into(),
            ));
        }
        if self.hash_length == 0 || self.hash_length > BLAKE2B_MAX_OUTPUT {
            return Err(CryptoError::InvalidOutputLength {
                min: 1,
                max: BLAKE2B_MAX_OUTPUT,
                got: self.hash_length,
            });
        }
        if self.salt_length < MIN_SALT_LENGTH {
            return Err(CryptoError::InvalidParameter(format!(
                "salt_length must be at least {MIN_SALT_LENGTH}"
            )));
        }
        Ok(())
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, username: &str, password: &str) -> CryptoResult<StoredHash> {
        self.validate()?;
        let salt = generate_salt(self.salt_length);
        derive_stored(username, password, salt, self.work_factor, self.hash_length)
    }
}

/// Random salt of `length` bytes
pub fn generate_salt(length: usize) -> Vec<u8> {
    let mut salt = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

// =============================================================================
// ACCOUNT API
// =============================================================================

fn account_kdf(
    username: &str,
    password: &str,
    salt: &[u8],
    work_factor: u32,
) -> CryptoResult<Pbkdf2<Blake2b>> {
    let mut bound_salt = Vec::with_capacity(salt.len() + username.len());
    bound_salt.extend_from_slice(salt);
    bound_salt.extend_from_slice(username.as_bytes());
    let kdf = Pbkdf2::with_blake2b(password.as_bytes(), &bound_salt, work_factor);
    bound_salt.zeroize();
    kdf
}

fn derive_stored(
    username: &str,
    password: &str,
    salt: Vec<u8>,
    work_factor: u32,
    hash_length: usize,
) -> CryptoResult<StoredHash> {
    debug!(username, work_factor, hash_length, "Hashing password");
    let mut facade = PasswordHash::new(account_kdf(username, password, &salt, work_factor)?);
    let hash = facade.generate(hash_length)?;
    StoredHash::new(work_factor, salt, hash)
}

/// Derive the stored form of `password` for `username`
///
/// # Arguments
/// * `username` - Account name, bound into the PBKDF2 salt
/// * `password` - Secret
/// * `salt` - Per-account random salt
/// * `work_factor` - PBKDF2 iterations, at least 1
pub fn hash_password(
    username: &str,
    password: &str,
    salt: &[u8],
    work_factor: u32,
) -> CryptoResult<StoredHash> {
    derive_stored(username, password, salt.to_vec(), work_factor, DEFAULT_HASH_LENGTH)
}

/// Check `candidate` against a stored hash for `username`
///
/// Any failure to rederive counts as a mismatch.
pub fn verify_password(username: &str, candidate: &str, stored: &StoredHash) -> bool {
    debug!(username, work_factor = stored.work_factor, "Verifying password");

    let result = account_kdf(username, candidate, &stored.salt, stored.work_factor)
        .and_then(|kdf| PasswordHash::new(kdf).validate(stored.hash.len(), &stored.hash));

    match result {
        Ok(true) => true,
        Ok(false) => {
            debug!(username, "Password mismatch");
            false
        }
        Err(e) => {
            warn!(username, error = %e, "Password verification could not run");
            false
        }
    }
}
