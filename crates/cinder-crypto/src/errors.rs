//! Error types for cinder-crypto

use cinder_core::CoreError;
use thiserror::Error;

/// Errors that can occur in cinder-crypto operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key has the wrong fixed length
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// Variable-length key exceeds its maximum
    #[error("Key too long: at most {max} bytes, got {got}")]
    KeyTooLong { max: usize, got: usize },

    /// Nonce has the wrong fixed length
    #[error("Invalid nonce length: expected {expected}, got {got}")]
    InvalidNonceLength { expected: usize, got: usize },

    /// Tag has the wrong fixed length
    #[error("Invalid tag length: expected {expected}, got {got}")]
    InvalidTagLength { expected: usize, got: usize },

    /// Requested digest length outside the supported range
    #[error("Invalid output length: must be {min}..={max}, got {got}")]
    InvalidOutputLength { min: usize, max: usize, got: usize },

    /// KDF asked for more bytes than it can produce
    #[error("Output limit exceeded: at most {max} bytes, requested {requested}")]
    OutputLimitExceeded { max: usize, requested: usize },

    /// Caller-supplied output buffer has the wrong length
    #[error("Buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },

    /// Non-positive iteration count, zero key length and similar
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Stored password hash could not be parsed
    #[error("Malformed stored hash: {0}")]
    MalformedStoredHash(String),

    /// AEAD tag did not verify (tampered data, wrong key, nonce or AAD)
    #[error("Authentication failed: tag mismatch")]
    AuthenticationFailed,

    /// Stream cipher block counter would wrap
    #[error("Block counter overflow: keystream exhausted for this key and nonce")]
    CounterOverflow,

    /// Hex or buffer error from cinder-core
    #[error("Encoding error: {0}")]
    Encoding(#[from] CoreError),

    /// IO error from a streaming source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`CryptoError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid argument at a call boundary
    Usage,
    /// Integrity check failed; no plaintext was released
    Authentication,
    /// Block counter exhausted
    ArithmeticOverflow,
    /// Underlying reader or writer failed
    Io,
}

impl CryptoError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::AuthenticationFailed => ErrorKind::Authentication,
            CryptoError::CounterOverflow => ErrorKind::ArithmeticOverflow,
            CryptoError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Usage,
        }
    }
}

/// Result type for cinder-crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CryptoError::AuthenticationFailed.kind(), ErrorKind::Authentication);
        assert_eq!(CryptoError::CounterOverflow.kind(), ErrorKind::ArithmeticOverflow);
        assert_eq!(
            CryptoError::InvalidNonceLength { expected: 24, got: 12 }.kind(),
            ErrorKind::Usage
        );
        assert_eq!(
            CryptoError::from(CoreError::OddHexLength(3)).kind(),
            ErrorKind::Usage
        );
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(CryptoError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_messages_name_expected_size() {
        let err = CryptoError::InvalidNonceLength { expected: 24, got: 12 };
        assert_eq!(err.to_string(), "Invalid nonce length: expected 24, got 12");
    }
}
