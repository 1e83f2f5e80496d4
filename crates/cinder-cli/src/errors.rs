//! CLI Errors
//!
//! Error types for the command-line front end.

use crate::config::ConfigError;
use cinder_core::errors::CoreError;
use cinder_crypto::errors::CryptoError;
use cinder_random::errors::RandomError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cryptographic operation failed
    #[error("{0}")]
    Crypto(#[from] CryptoError),

    /// Shuffle could not be set up
    #[error("Shuffle error: {0}")]
    Random(#[from] RandomError),

    /// Malformed hex argument
    #[error("Invalid hex argument: {0}")]
    Hex(#[from] CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Argument outside what the command accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Password did not match the stored hash
    #[error("Password verification failed")]
    VerificationFailed,

    /// Unshuffle did not restore the original order
    #[error("Unshuffle did not restore the input order")]
    UnshuffleMismatch,
}
