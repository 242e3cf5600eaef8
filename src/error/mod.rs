//! Error handling module for the compressor

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Setup-level error type (configuration and logging)
#[derive(Error, Debug)]
pub enum CompressorError {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    /// Domain rule or session failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// TOML parse error
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for compressor setup operations
pub type CompressorResult<T> = std::result::Result<T, CompressorError>;
