//! CLI Configuration
//!
//! Settings shared by every subcommand, loaded from TOML.

use cinder_core::STREAM_CHUNK_SIZE;
use cinder_crypto::PasswordParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest accepted streaming buffer
pub const MIN_CHUNK_SIZE: usize = 64;

/// Streaming AEAD settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Buffer size for encrypt/decrypt, in bytes
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: STREAM_CHUNK_SIZE,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CinderConfig {
    /// Password hashing parameters
    pub password: PasswordParams,

    /// Streaming parameters
    pub stream: StreamConfig,

    /// Log level
    pub log_level: String,
}

impl Default for CinderConfig {
    fn default() -> Self {
        Self {
            password: PasswordParams::default(),
            stream: StreamConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CinderConfig {
    /// Create a new configuration builder
    pub fn builder() -> CinderConfigBuilder {
        CinderConfigBuilder::default()
    }

    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.password
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("password: {e}")))?;

        if self.stream.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "stream.chunk_size must be at least {MIN_CHUNK_SIZE}"
            )));
        }

        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Map a level name to a tracing level, case-insensitively
pub fn parse_level(name: &str) -> Option<tracing::Level> {
    use tracing::Level;

    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Configuration builder
#[derive(Default)]
pub struct CinderConfigBuilder {
    config: CinderConfig,
}

impl CinderConfigBuilder {
    /// Set PBKDF2 iterations for password hashing
    pub fn work_factor(mut self, iterations: u32) -> Self {
        self.config.password.work_factor = iterations;
        self
    }

    /// Set stored hash length
    pub fn hash_length(mut self, length: usize) -> Self {
        self.config.password.hash_length = length;
        self
    }

    /// Set random salt length
    pub fn salt_length(mut self, length: usize) -> Self {
        self.config.password.salt_length = length;
        self
    }

    /// Set streaming buffer size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.stream.chunk_size = size;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CinderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
